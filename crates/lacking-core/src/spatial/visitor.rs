// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Visitors receive the items accepted by a spatial query.

/// Receives the items accepted by a spatial query, one at a time.
pub trait Visitor<T> {
    /// Called once for every accepted item.
    fn visit(&mut self, item: &T);
}

impl<T, F> Visitor<T> for F
where
    F: FnMut(&T),
{
    fn visit(&mut self, item: &T) {
        self(item)
    }
}

/// A visitor that collects accepted items into a reusable vector.
#[derive(Debug, Clone)]
pub struct VisitorBucket<T> {
    items: Vec<T>,
}

impl<T> Default for VisitorBucket<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T> VisitorBucket<T> {
    /// Creates an empty bucket with room for `capacity` items.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
        }
    }

    /// Removes all collected items, keeping the allocation.
    pub fn reset(&mut self) {
        self.items.clear();
    }

    /// Returns the collected items in visit order.
    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Returns the number of collected items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if nothing was collected.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T: Clone> Visitor<T> for VisitorBucket<T> {
    fn visit(&mut self, item: &T) {
        self.items.push(item.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bucket_collects_and_resets() {
        let mut bucket = VisitorBucket::with_capacity(4);
        bucket.visit(&1u32);
        bucket.visit(&2u32);
        assert_eq!(bucket.items(), &[1, 2]);
        bucket.reset();
        assert!(bucket.is_empty());
    }

    #[test]
    fn closures_are_visitors() {
        let mut sum = 0;
        {
            let mut visitor = |item: &i32| sum += *item;
            visitor.visit(&3);
            visitor.visit(&4);
        }
        assert_eq!(sum, 7);
    }
}
