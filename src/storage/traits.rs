//! Byte-addressable store trait
//!
//! The board backs this with the flash-emulated EEPROM. Writes land in a
//! RAM shadow and only become durable on [`Storage::commit`];
//! [`Storage::discard`] throws the shadow away.

/// Errors that can occur during storage operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Access outside the store
    OutOfBounds,
    /// The backing device refused the read
    ReadFailed,
    /// The backing device refused the write
    WriteFailed,
    /// Flushing to the backing device failed
    CommitFailed,
}

/// Abstract persistent store
pub trait Storage {
    /// Fill `buf` with the bytes at `offset`
    fn read(&mut self, offset: usize, buf: &mut [u8]) -> Result<(), StorageError>;

    /// Stage `data` at `offset`
    fn write(&mut self, offset: usize, data: &[u8]) -> Result<(), StorageError>;

    /// Make all staged writes durable
    fn commit(&mut self) -> Result<(), StorageError>;

    /// Drop staged writes, restoring the shadow from the committed image
    fn discard(&mut self) -> Result<(), StorageError>;
}

#[cfg(test)]
pub mod mock {
    //! In-memory store for testing

    use super::*;
    use crate::config::storage::{ERASED, STORE_SIZE};
    use std::vec::Vec;

    /// Mock store with a staged and a committed image
    ///
    /// Reads see staged data, like the RAM shadow of the real EEPROM
    /// emulation. [`MockStorage::reboot`] drops everything not committed.
    #[derive(Clone)]
    pub struct MockStorage {
        staged: Vec<u8>,
        committed: Vec<u8>,
        commits: u32,
        discards: u32,
        next_read_error: Option<StorageError>,
        next_write_error: Option<StorageError>,
        write_error_after: Option<(u32, StorageError)>,
        next_commit_error: Option<StorageError>,
    }

    impl MockStorage {
        /// A fully erased store
        pub fn new() -> Self {
            Self {
                staged: vec![ERASED; STORE_SIZE],
                committed: vec![ERASED; STORE_SIZE],
                commits: 0,
                discards: 0,
                next_read_error: None,
                next_write_error: None,
                write_error_after: None,
                next_commit_error: None,
            }
        }

        /// Store with every byte zeroed
        pub fn zeroed() -> Self {
            let mut storage = Self::new();
            storage.staged = vec![0; STORE_SIZE];
            storage.committed = vec![0; STORE_SIZE];
            storage
        }

        /// Poke bytes directly into the committed image, bypassing commit
        pub fn poke(&mut self, offset: usize, data: &[u8]) {
            self.staged[offset..offset + data.len()].copy_from_slice(data);
            self.committed[offset..offset + data.len()].copy_from_slice(data);
        }

        /// Committed bytes
        pub fn committed(&self, offset: usize, len: usize) -> &[u8] {
            &self.committed[offset..offset + len]
        }

        /// Simulate a power cycle: staged writes not committed are lost
        pub fn reboot(&mut self) {
            self.staged = self.committed.clone();
        }

        pub fn commit_count(&self) -> u32 {
            self.commits
        }

        pub fn discard_count(&self) -> u32 {
            self.discards
        }

        pub fn set_next_read_error(&mut self, error: StorageError) {
            self.next_read_error = Some(error);
        }

        pub fn set_next_write_error(&mut self, error: StorageError) {
            self.next_write_error = Some(error);
        }

        /// Let `writes` more writes succeed, then fail the one after
        pub fn set_write_error_after(&mut self, writes: u32, error: StorageError) {
            self.write_error_after = Some((writes, error));
        }

        pub fn set_next_commit_error(&mut self, error: StorageError) {
            self.next_commit_error = Some(error);
        }
    }

    impl Default for MockStorage {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Storage for MockStorage {
        fn read(&mut self, offset: usize, buf: &mut [u8]) -> Result<(), StorageError> {
            if let Some(error) = self.next_read_error.take() {
                return Err(error);
            }
            let end = offset.checked_add(buf.len()).ok_or(StorageError::OutOfBounds)?;
            let source = self.staged.get(offset..end).ok_or(StorageError::OutOfBounds)?;
            buf.copy_from_slice(source);
            Ok(())
        }

        fn write(&mut self, offset: usize, data: &[u8]) -> Result<(), StorageError> {
            if let Some(error) = self.next_write_error.take() {
                return Err(error);
            }
            match self.write_error_after.take() {
                Some((0, error)) => return Err(error),
                Some((remaining, error)) => self.write_error_after = Some((remaining - 1, error)),
                None => {}
            }
            let end = offset.checked_add(data.len()).ok_or(StorageError::OutOfBounds)?;
            let target = self.staged.get_mut(offset..end).ok_or(StorageError::OutOfBounds)?;
            target.copy_from_slice(data);
            Ok(())
        }

        fn commit(&mut self) -> Result<(), StorageError> {
            if let Some(error) = self.next_commit_error.take() {
                return Err(error);
            }
            self.committed = self.staged.clone();
            self.commits += 1;
            Ok(())
        }

        fn discard(&mut self) -> Result<(), StorageError> {
            self.staged = self.committed.clone();
            self.discards += 1;
            Ok(())
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_uncommitted_writes_lost_on_reboot() {
            let mut storage = MockStorage::new();
            storage.write(10, &[1, 2, 3]).unwrap();

            let mut buf = [0u8; 3];
            storage.read(10, &mut buf).unwrap();
            assert_eq!(buf, [1, 2, 3]);

            storage.reboot();
            storage.read(10, &mut buf).unwrap();
            assert_eq!(buf, [ERASED; 3]);
        }

        #[test]
        fn test_out_of_bounds() {
            let mut storage = MockStorage::new();
            let mut buf = [0u8; 4];
            assert_eq!(
                storage.read(STORE_SIZE - 2, &mut buf),
                Err(StorageError::OutOfBounds)
            );
            assert_eq!(
                storage.write(STORE_SIZE, &[0]),
                Err(StorageError::OutOfBounds)
            );
        }

        #[test]
        fn test_commit_error_is_one_shot() {
            let mut storage = MockStorage::new();
            storage.set_next_commit_error(StorageError::CommitFailed);
            assert_eq!(storage.commit(), Err(StorageError::CommitFailed));
            assert!(storage.commit().is_ok());
            assert_eq!(storage.commit_count(), 1);
        }

        #[test]
        fn test_discard_restores_committed_image() {
            let mut storage = MockStorage::new();
            storage.write(0, &[7, 7]).unwrap();
            storage.commit().unwrap();
            storage.write(0, &[9, 9]).unwrap();

            storage.discard().unwrap();

            let mut buf = [0u8; 2];
            storage.read(0, &mut buf).unwrap();
            assert_eq!(buf, [7, 7]);
            assert_eq!(storage.discard_count(), 1);
        }
    }
}
