//! Directory-level inspection of book and author folders

use crate::patterns::{book_number_in_file, is_disc_folder, is_numbered_book_folder};
use shelfwise_config::LibraryConfig;
use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Series folders hold at least this many numbered book folders
pub const SERIES_FOLDER_MIN_BOOKS: usize = 2;

/// Multi-book folders hold files for at least this many book numbers
pub const MULTI_BOOK_MIN_NUMBERS: usize = 2;

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.'))
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// Visible subdirectories, sorted by name
pub fn subdirs(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() && !is_hidden(&path) {
            dirs.push(path);
        }
    }
    dirs.sort();
    Ok(dirs)
}

/// Audio files directly inside `dir`, sorted by name
pub fn audio_files_in(dir: &Path, library: &LibraryConfig) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file()
            && !is_hidden(&path)
            && extension_of(&path).is_some_and(|e| library.is_audio_extension(&e))
        {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Audio files anywhere below `dir`, sorted by path
pub fn audio_files_below(dir: &Path, library: &LibraryConfig) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| !is_hidden(p))
        .filter(|p| extension_of(p).is_some_and(|e| library.is_audio_extension(&e)))
        .collect();
    files.sort();
    files
}

/// Ebook files anywhere below `dir`
pub fn ebook_count(dir: &Path, library: &LibraryConfig) -> usize {
    WalkDir::new(dir)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| extension_of(e.path()).is_some_and(|x| library.is_ebook_extension(&x)))
        .count()
}

/// Direct subfolders that look like disc or part folders
pub fn disc_folder_count(dir: &Path) -> io::Result<usize> {
    Ok(subdirs(dir)?
        .iter()
        .filter(|d| file_name(d).is_some_and(is_disc_folder))
        .count())
}

/// Direct subfolders that look like one numbered book each
pub fn numbered_book_folders(dir: &Path) -> io::Result<Vec<PathBuf>> {
    Ok(subdirs(dir)?
        .into_iter()
        .filter(|d| file_name(d).is_some_and(is_numbered_book_folder))
        .collect())
}

/// A folder with several numbered book folders is a series container
pub fn is_series_folder(dir: &Path) -> io::Result<bool> {
    Ok(numbered_book_folders(dir)?.len() >= SERIES_FOLDER_MIN_BOOKS)
}

/// Distinct book numbers spelled out in the names of the audio files
pub fn distinct_book_numbers(dir: &Path, library: &LibraryConfig) -> io::Result<BTreeSet<String>> {
    Ok(audio_files_in(dir, library)?
        .iter()
        .filter_map(|f| f.file_stem().and_then(|s| s.to_str()))
        .filter_map(book_number_in_file)
        .collect())
}

/// A folder with audio files for several different books
pub fn is_multi_book_files(dir: &Path, library: &LibraryConfig) -> io::Result<bool> {
    let files = audio_files_in(dir, library)?;
    if files.len() < MULTI_BOOK_MIN_NUMBERS {
        return Ok(false);
    }
    Ok(distinct_book_numbers(dir, library)?.len() >= MULTI_BOOK_MIN_NUMBERS)
}

/// True if every subfolder is a disc folder and there is at least one
pub fn only_disc_folders(dir: &Path) -> io::Result<bool> {
    let dirs = subdirs(dir)?;
    Ok(!dirs.is_empty()
        && dirs
            .iter()
            .all(|d| file_name(d).is_some_and(is_disc_folder)))
}

pub(crate) fn file_name(path: &Path) -> Option<&str> {
    path.file_name().and_then(|n| n.to_str())
}
