use std::hash::Hash;

use crate::wrappers::OrderedMap;


// ToVec
// ------------------------------------------------------------------------------------------------

/// Utility trait for converting things to vectors. This is used by the Object::array constructor.
pub trait ToVec<T> {
    fn to_vec(self) -> Vec<T>;
}

impl<T> ToVec<T> for () {
    fn to_vec(self) -> Vec<T> {
        vec![]
    }
}

impl<T> ToVec<T> for Vec<T> {
    fn to_vec(self) -> Vec<T> {
        self
    }
}

impl<T, U, const N: usize> ToVec<T> for [U; N]
where
    T: From<U>,
{
    fn to_vec(self) -> Vec<T> {
        self.into_iter().map(T::from).collect()
    }
}


// ToMap
// ------------------------------------------------------------------------------------------------

/// Utility trait for converting things to maps. This is used by the Object::hash constructor.
pub trait ToMap<K, V> {
    fn to_map(self) -> OrderedMap<K, V>;
}

impl<K, V> ToMap<K, V> for OrderedMap<K, V> {
    fn to_map(self) -> OrderedMap<K, V> {
        self
    }
}

impl<K, V> ToMap<K, V> for () {
    fn to_map(self) -> OrderedMap<K, V> {
        OrderedMap::new()
    }
}

impl<K, V, A, B> ToMap<K, V> for Vec<(A, B)>
where
    K: Hash + Eq + From<A>,
    V: From<B>,
{
    fn to_map(self) -> OrderedMap<K, V> {
        self.into_iter().map(|(k, v)| (K::from(k), V::from(v))).collect()
    }
}
