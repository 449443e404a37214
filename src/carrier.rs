//! C1 — Value Carrier.
//!
//! `Carrier<T>` is a one-word polymorphic slot: a single machine word that
//! holds `T` inline when it fits, or a refcounted pointer to a heap copy
//! otherwise. `Union2`/`Union3`/`Union4` are closed tagged unions built the
//! same way, with the run-time discriminator folded into the low 4 bits of
//! the word (up to 16 alternatives fit this scheme; we give the 2-, 3- and
//! 4-way cases a name here because those are the arities exercised by this
//! crate's own clients — `tree.rs`'s node shapes and the
//! `Union<Empty, Node<T>>` demo in `tests/union_list_suite.rs` — the
//! 5-through-16 cases follow the identical pattern and are not pre-built
//! here until a client needs one).
//!
//! Same half-word-inline/full-word-inline split and low-bit tag as a
//! tagged-pointer node header that steals bits from a pointer and
//! hand-rolls reference counting instead of leaning on `Rc`/`Arc`, so the
//! representation stays exactly one word.

#[cfg(not(target_pointer_width = "64"))]
compile_error!("persistable requires a 64-bit target (tag bits are stolen from a 64-bit word)");

use std::fmt;
use std::marker::PhantomData;
use std::mem::{align_of, size_of};
use std::ptr::NonNull;
use std::sync::atomic::{AtomicUsize, Ordering};

const WORD: usize = size_of::<usize>();
const HALF_WORD: usize = WORD / 2;
pub(crate) const TAG_BITS: u32 = 4;
pub(crate) const TAG_MASK: usize = (1 << TAG_BITS) - 1;
const HEAP_ALIGN: usize = 16;

/// Heap block for boxed carrier/union payloads. Hand-rolled refcount and
/// forced 16-byte alignment so the low 4 pointer bits are always free for a
/// tag.
#[repr(align(16))]
struct HeapBox<T> {
    rc: AtomicUsize,
    value: T,
}

impl<T> HeapBox<T> {
    fn alloc(value: T) -> NonNull<HeapBox<T>> {
        let boxed = Box::new(HeapBox {
            rc: AtomicUsize::new(1),
            value,
        });
        NonNull::from(Box::leak(boxed))
    }

    unsafe fn rc_inc(ptr: NonNull<HeapBox<T>>) {
        unsafe {
            (*ptr.as_ptr()).rc.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Decrements the refcount, freeing the block if it hit zero.
    unsafe fn rc_dec(ptr: NonNull<HeapBox<T>>) {
        unsafe {
            if (*ptr.as_ptr()).rc.fetch_sub(1, Ordering::AcqRel) == 1 {
                drop(Box::from_raw(ptr.as_ptr()));
            }
        }
    }
}

#[inline]
const fn fits_inline<T>() -> bool {
    size_of::<T>() <= WORD && align_of::<T>() <= align_of::<usize>()
}

#[inline]
const fn fits_half_word<T>() -> bool {
    size_of::<T>() <= HALF_WORD && align_of::<T>() <= align_of::<usize>()
}

/// A one-word polymorphic slot.
pub struct Carrier<T> {
    slot: usize,
    _marker: PhantomData<T>,
}

impl<T> Carrier<T> {
    const INLINE: bool = fits_inline::<T>();

    /// `carry(t)`: stores `t` inline or boxes it.
    pub fn carry(value: T) -> Self {
        if Self::INLINE {
            let mut slot: usize = 0;
            unsafe { (&mut slot as *mut usize as *mut T).write(value) };
            Carrier {
                slot,
                _marker: PhantomData,
            }
        } else {
            let ptr = HeapBox::alloc(value);
            debug_assert_eq!(ptr.as_ptr() as usize & (HEAP_ALIGN - 1), 0);
            Carrier {
                slot: ptr.as_ptr() as usize,
                _marker: PhantomData,
            }
        }
    }

    /// `uncarry(v)`: an immutable view of the carried `T`.
    pub fn uncarry(&self) -> &T {
        if Self::INLINE {
            unsafe { &*(&self.slot as *const usize as *const T) }
        } else {
            unsafe { &(*(self.slot as *const HeapBox<T>)).value }
        }
    }
}

impl<T: Clone> Clone for Carrier<T> {
    fn clone(&self) -> Self {
        if Self::INLINE {
            Carrier::carry(self.uncarry().clone())
        } else {
            let ptr = unsafe { NonNull::new_unchecked(self.slot as *mut HeapBox<T>) };
            unsafe { HeapBox::rc_inc(ptr) };
            Carrier {
                slot: self.slot,
                _marker: PhantomData,
            }
        }
    }
}

impl<T> Drop for Carrier<T> {
    fn drop(&mut self) {
        if Self::INLINE {
            unsafe { std::ptr::drop_in_place(&mut self.slot as *mut usize as *mut T) };
        } else {
            let ptr = unsafe { NonNull::new_unchecked(self.slot as *mut HeapBox<T>) };
            unsafe { HeapBox::rc_dec(ptr) };
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Carrier<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.uncarry().fmt(f)
    }
}

impl<T: PartialEq> PartialEq for Carrier<T> {
    fn eq(&self, other: &Self) -> bool {
        self.uncarry() == other.uncarry()
    }
}

/// Packs `value` into a word with `tag` in the low 4 bits, either inline
/// (above the tag, for payloads that fit in half a word) or as a tagged,
/// 16-byte-aligned heap pointer.
fn pack_word<T>(value: T, tag: u8) -> usize {
    debug_assert!((tag as usize) <= TAG_MASK);
    if fits_half_word::<T>() {
        let mut word: usize = 0;
        unsafe {
            let dst = (&mut word as *mut usize as *mut u8).add(HALF_WORD) as *mut T;
            dst.write(value);
        }
        word | tag as usize
    } else {
        let ptr = HeapBox::alloc(value).as_ptr() as usize;
        debug_assert_eq!(ptr & (HEAP_ALIGN - 1), 0);
        ptr | tag as usize
    }
}

unsafe fn unpack_ref<T>(word: &usize) -> &T {
    if fits_half_word::<T>() {
        unsafe {
            let src = (word as *const usize as *const u8).add(HALF_WORD) as *const T;
            &*src
        }
    } else {
        let ptr = (*word & !TAG_MASK) as *const HeapBox<T>;
        unsafe { &(*ptr).value }
    }
}

unsafe fn rc_inc_variant<T>(word: usize) {
    if !fits_half_word::<T>() {
        let ptr = unsafe { NonNull::new_unchecked((word & !TAG_MASK) as *mut HeapBox<T>) };
        unsafe { HeapBox::rc_inc(ptr) };
    }
}

unsafe fn rc_dec_variant<T>(word: usize) {
    if fits_half_word::<T>() {
        let mut word = word;
        unsafe {
            let dst = (&mut word as *mut usize as *mut u8).add(HALF_WORD) as *mut T;
            std::ptr::drop_in_place(dst);
        }
    } else {
        let ptr = unsafe { NonNull::new_unchecked((word & !TAG_MASK) as *mut HeapBox<T>) };
        unsafe { HeapBox::rc_dec(ptr) };
    }
}

/// Generates a closed tagged union type over the listed alternatives. Each
/// alternative gets a distinct constructor (`new_$field`) and a tag-checked
/// accessor (`as_$field`).
macro_rules! define_union {
    ($(#[$outer:meta])* $name:ident [$($idx:literal : $ty:ident => $ctor:ident, $acc:ident),+ $(,)?]) => {
        $(#[$outer])*
        pub struct $name<$($ty),+> {
            word: usize,
            _marker: PhantomData<($($ty,)+)>,
        }

        impl<$($ty),+> $name<$($ty),+> {
            $(
                #[doc = concat!("`pack`: wraps a `", stringify!($ty), "` as alternative ", stringify!($idx), ".")]
                pub fn $ctor(value: $ty) -> Self {
                    $name {
                        word: pack_word(value, $idx),
                        _marker: PhantomData,
                    }
                }
            )+

            /// `tag(u)`: the low-4-bit discriminator.
            pub fn tag(&self) -> u8 {
                (self.word & TAG_MASK) as u8
            }

            $(
                #[doc = concat!("`unpack`: tag-checked view of alternative ", stringify!($idx), ".")]
                pub fn $acc(&self) -> &$ty {
                    assert_eq!(
                        self.tag(), $idx,
                        "unpack: wrong alternative for this union value",
                    );
                    unsafe { unpack_ref::<$ty>(&self.word) }
                }
            )+
        }

        impl<$($ty),+> Drop for $name<$($ty),+> {
            fn drop(&mut self) {
                match self.tag() {
                    $($idx => unsafe { rc_dec_variant::<$ty>(self.word) },)+
                    _ => unreachable!("corrupt union tag"),
                }
            }
        }

        impl<$($ty: Clone),+> Clone for $name<$($ty),+> {
            fn clone(&self) -> Self {
                match self.tag() {
                    $(
                        $idx => {
                            if fits_half_word::<$ty>() {
                                let value = unsafe { unpack_ref::<$ty>(&self.word) }.clone();
                                $name::$ctor(value)
                            } else {
                                unsafe { rc_inc_variant::<$ty>(self.word) };
                                $name { word: self.word, _marker: PhantomData }
                            }
                        }
                    )+
                    _ => unreachable!("corrupt union tag"),
                }
            }
        }
    };
}

define_union!(
    /// Closed tagged union over 2 alternatives.
    Union2 [0: A => new_a, as_a, 1: B => new_b, as_b]
);

define_union!(
    /// Closed tagged union over 3 alternatives.
    Union3 [0: A => new_a, as_a, 1: B => new_b, as_b, 2: C => new_c, as_c]
);

define_union!(
    /// Closed tagged union over 4 alternatives.
    Union4 [
        0: A => new_a, as_a,
        1: B => new_b, as_b,
        2: C => new_c, as_c,
        3: D => new_d, as_d
    ]
);

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn carrier_inline_roundtrip() {
        let c = Carrier::carry(42u8);
        assert_eq!(*c.uncarry(), 42u8);
    }

    #[test]
    fn carrier_boxed_roundtrip() {
        #[derive(Clone, Debug, PartialEq)]
        struct Big([u64; 4]);
        let c = Carrier::carry(Big([1, 2, 3, 4]));
        assert_eq!(*c.uncarry(), Big([1, 2, 3, 4]));
    }

    #[test]
    fn carrier_clone_shares_boxed_storage() {
        let c1 = Carrier::carry(Arc::new(String::from("hello")));
        let c2 = c1.clone();
        assert_eq!(c1.uncarry(), c2.uncarry());
    }

    #[test]
    fn union2_tag_and_unpack() {
        let a: Union2<u32, String> = Union2::new_a(7);
        assert_eq!(a.tag(), 0);
        assert_eq!(*a.as_a(), 7);

        let b: Union2<u32, String> = Union2::new_b(String::from("hi"));
        assert_eq!(b.tag(), 1);
        assert_eq!(b.as_b(), "hi");
    }

    #[test]
    #[should_panic(expected = "wrong alternative")]
    fn union2_unpack_wrong_tag_panics() {
        let a: Union2<u32, String> = Union2::new_a(7);
        let _ = a.as_b();
    }

    #[test]
    fn union4_covers_every_alternative() {
        let values: Vec<Union4<u8, u16, u32, u64>> = vec![
            Union4::new_a(1),
            Union4::new_b(2),
            Union4::new_c(3),
            Union4::new_d(4),
        ];
        let tags: Vec<u8> = values.iter().map(|v| v.tag()).collect();
        assert_eq!(tags, vec![0, 1, 2, 3]);
    }
}
