use crate::error::H5Result;

/// A length-known, randomly indexable collection of samples, the shape a
/// training loop's batching component expects.
pub trait IndexedDataset {
    type Item;

    fn len(&self) -> usize;

    fn get(&self, index: usize) -> H5Result<Self::Item>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate over every item in index order.
    fn iter(&self) -> DatasetIterator<'_, Self>
    where
        Self: Sized,
    {
        DatasetIterator {
            dataset: self,
            current: 0,
        }
    }
}

pub struct DatasetIterator<'a, D> {
    dataset: &'a D,
    current: usize,
}

impl<D: IndexedDataset> Iterator for DatasetIterator<'_, D> {
    type Item = H5Result<D::Item>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current >= self.dataset.len() {
            return None;
        }
        let item = self.dataset.get(self.current);
        self.current += 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.dataset.len().saturating_sub(self.current);
        (remaining, Some(remaining))
    }
}

impl<D: IndexedDataset> ExactSizeIterator for DatasetIterator<'_, D> {}
