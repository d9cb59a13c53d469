//! Struct archiving functionality
//!
//! An [`Archiver`] appends serialisable records to a CSV file, one file per
//! record stream, typically under the session's data directory. To add
//! archiving functionality to a struct implement the [`Archived`] trait.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use csv::WriterBuilder;
pub use csv::Writer;
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::path::Path;
use thiserror::Error;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// An object used to write CSV archive files.
#[derive(Default)]
pub struct Archiver {
    writer: Option<Writer<File>>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors raised by an archiver.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("The archiver has not been initialised")]
    NotInitialised,
}

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A trait which enables a struct to be archived as a CSV record stream.
///
/// To implement this trait, the struct shall hold an `Archiver` member which
/// is set up in the struct's `new` or `init` function, and serialise its
/// current state into it on each `write` call.
pub trait Archived {
    /// Write the archives for this struct
    fn write(&mut self) -> Result<(), Box<dyn std::error::Error>>;
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Archiver {
    /// Create a new archiver writing to the given file path.
    ///
    /// The file is created, replacing any previous content, and then opened
    /// for appending. The first serialised record also writes a header row
    /// derived from the record's field names.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        // Create the file if it does not exist
        File::create(path.as_ref())?;

        // Open the file in append mode
        let file = OpenOptions::new().append(true).open(path.as_ref())?;

        let writer = WriterBuilder::new().has_headers(true).from_writer(file);

        Ok(Self {
            writer: Some(writer),
        })
    }

    /// Serialise a record into the archive.
    pub fn serialise<T: Serialize>(
        &mut self,
        record: T,
    ) -> Result<(), Box<dyn std::error::Error>> {
        match self.writer {
            Some(ref mut writer) => {
                writer.serialize(record)?;
                writer.flush()?;
                Ok(())
            }
            None => Err(Box::new(ArchiveError::NotInitialised)),
        }
    }
}
