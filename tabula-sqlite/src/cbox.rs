use std::{
    ops::{Deref, DerefMut},
    ptr,
};

pub(crate) trait NullCheck: Copy {
    fn null() -> Self;
    fn is_null(&self) -> bool;
}

impl<T> NullCheck for *const T {
    fn null() -> Self {
        ptr::null()
    }
    fn is_null(&self) -> bool {
        <*const T>::is_null(*self)
    }
}

impl<T> NullCheck for *mut T {
    fn null() -> Self {
        ptr::null_mut()
    }
    fn is_null(&self) -> bool {
        <*mut T>::is_null(*self)
    }
}

/// Owner of an engine allocated pointer, `dealloc` runs on drop unless the pointer is null.
#[derive(Debug)]
pub(crate) struct CBox<T: NullCheck> {
    ptr: T,
    dealloc: fn(T),
}

impl<T: NullCheck> CBox<T> {
    pub fn new(ptr: T, dealloc: fn(T)) -> Self {
        Self { ptr, dealloc }
    }

    /// Gives up the ownership, the box is left holding null.
    pub fn take(&mut self) -> T {
        std::mem::replace(&mut self.ptr, T::null())
    }
}

impl<T: NullCheck> Drop for CBox<T> {
    fn drop(&mut self) {
        let ptr = self.take();
        if !NullCheck::is_null(&ptr) {
            (self.dealloc)(ptr);
        }
    }
}

impl<T: NullCheck> Deref for CBox<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.ptr
    }
}

impl<T: NullCheck> DerefMut for CBox<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.ptr
    }
}

unsafe impl<T: NullCheck> Send for CBox<T> {}
unsafe impl<T: NullCheck> Sync for CBox<T> {}
