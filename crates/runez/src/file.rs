// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! File operations with dry-run support, logging and a configurable
//! failure policy.
//!
//! Mutating functions return an [`Outcome`]: [`Outcome::NoOp`] when there
//! was nothing to do, [`Outcome::Done`] when the operation was performed (or
//! would have been in dry-run mode), and [`Outcome::Failed`] when it failed
//! under a non-fatal [`Policy`].

use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Read, Write};
use std::path::{Component, Path, PathBuf};
use std::time::{Duration, SystemTime};

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use sha2::{Digest, Sha224, Sha256, Sha384, Sha512};
use tempfile::TempDir;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::{
    Anchored, Error, Outcome, Policy, Result, SYMBOLIC_TMP, abort, hdry, hlog,
    represented_bytesize, resolved_path, short,
};

#[cfg(test)]
#[path = "./file_test.rs"]
mod file_test;

/// What to do when the destination of a transfer already exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Overwrite {
    /// Delete the existing destination first.
    #[default]
    Replace,
    /// Fail.
    Refuse,
    /// Don't check, copying a folder merges it into an existing one.
    Unchecked,
}

/// Options for [`copy`], [`move_path`], [`symlink`], [`compress`] and [`decompress`].
#[derive(Debug, Clone)]
pub struct TransferOptions {
    pub overwrite: Overwrite,
    /// Fail when the source does not exist.
    pub must_exist: bool,
    /// File or folder names skipped when copying a folder.
    pub ignore: Vec<String>,
    pub policy: Policy,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            overwrite: Overwrite::default(),
            must_exist: true,
            ignore: Vec::new(),
            policy: Policy::default(),
        }
    }
}

impl TransferOptions {
    pub fn with_policy(policy: Policy) -> Self {
        Self {
            policy,
            ..Default::default()
        }
    }
}

/// Archive flavors understood by [`compress`] and [`decompress`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    Tar,
    TarGz,
    Zip,
}

impl ArchiveKind {
    /// Archive kind corresponding to the extension of `path`, if known.
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_string_lossy().to_lowercase();
        let (_, ext) = name.rsplit_once('.')?;
        match ext {
            "tar" => Some(Self::Tar),
            "gz" | "tgz" => Some(Self::TarGz),
            "zip" => Some(Self::Zip),
            _ => None,
        }
    }
}

enum Action<'a> {
    Copy(&'a [String]),
    Move,
    Symlink,
    Compress(ArchiveKind, PathBuf),
    Decompress(ArchiveKind, bool),
}

impl Action<'_> {
    fn name(&self) -> &'static str {
        match self {
            Action::Copy(_) => "copy",
            Action::Move => "move",
            Action::Symlink => "symlink",
            Action::Compress(ArchiveKind::Zip, _) => "zip",
            Action::Compress(..) => "tar",
            Action::Decompress(ArchiveKind::Zip, _) => "unzip",
            Action::Decompress(..) => "untar",
        }
    }
}

/// Copy `source` to `destination`, folders are copied recursively.
pub fn copy<S: AsRef<Path>, D: AsRef<Path>>(
    source: S,
    destination: D,
    options: &TransferOptions,
) -> Result<Outcome> {
    file_op(
        source.as_ref(),
        destination.as_ref(),
        Action::Copy(&options.ignore),
        options,
    )
}

/// Move `source` to `destination`.
pub fn move_path<S: AsRef<Path>, D: AsRef<Path>>(
    source: S,
    destination: D,
    options: &TransferOptions,
) -> Result<Outcome> {
    file_op(source.as_ref(), destination.as_ref(), Action::Move, options)
}

/// Make `destination` a symlink pointing to `source`.
///
/// The link is relative when `source` lives under the parent folder of
/// `destination`.
pub fn symlink<S: AsRef<Path>, D: AsRef<Path>>(
    source: S,
    destination: D,
    options: &TransferOptions,
) -> Result<Outcome> {
    file_op(source.as_ref(), destination.as_ref(), Action::Symlink, options)
}

/// Archive `source` into `destination`, flavor determined by the extension
/// of `destination` (`.tar`, `.tar.gz`/`.tgz` or `.zip`).
///
/// Contents are stored under `arcname` in the archive, the basename of
/// `source` by default.
pub fn compress<S: AsRef<Path>, D: AsRef<Path>>(
    source: S,
    destination: D,
    arcname: Option<&str>,
    options: &TransferOptions,
) -> Result<Outcome> {
    let (source, destination) = (source.as_ref(), destination.as_ref());
    let Some(kind) = ArchiveKind::from_path(destination) else {
        let message = format!(
            "Unknown extension '{}': can't compress file",
            basename(destination, false, false)
        );
        return abort(message, &options.policy, Outcome::Failed);
    };
    let arcname = match arcname {
        Some(name) => PathBuf::from(name),
        None => PathBuf::from(basename(source, false, false)),
    };
    file_op(source, destination, Action::Compress(kind, arcname), options)
}

/// Extract archive `source` into folder `destination`.
///
/// With `simplify`, an archive holding one single top folder has the
/// contents of that folder extracted to `destination`.
pub fn decompress<S: AsRef<Path>, D: AsRef<Path>>(
    source: S,
    destination: D,
    simplify: bool,
    options: &TransferOptions,
) -> Result<Outcome> {
    let (source, destination) = (source.as_ref(), destination.as_ref());
    let Some(kind) = ArchiveKind::from_path(source) else {
        let message = format!(
            "Unknown extension '{}': can't decompress file",
            basename(source, false, false)
        );
        return abort(message, &options.policy, Outcome::Failed);
    };
    file_op(
        source,
        destination,
        Action::Decompress(kind, simplify),
        options,
    )
}

fn file_op(
    source: &Path,
    destination: &Path,
    action: Action<'_>,
    options: &TransferOptions,
) -> Result<Outcome> {
    let policy = &options.policy;
    if source.as_os_str().is_empty() || destination.as_os_str().is_empty() || source == destination
    {
        return Ok(Outcome::NoOp);
    }

    let name = action.name();
    let indicator = if matches!(action, Action::Symlink) {
        "<-"
    } else {
        "->"
    };
    let description = format!(
        "{name} {} {indicator} {}",
        short(source.display()),
        short(destination.display())
    );
    let psource = parent_folder(source, None);
    let pdest = resolved_path(destination, None);
    if psource.starts_with(&pdest) {
        let message = format!("Can't {description}: source contained in destination");
        return abort(message, policy, Outcome::Failed);
    }

    if hdry(policy, &description) {
        return Ok(Outcome::Done);
    }

    if options.must_exist && !(source.exists() || source.is_symlink()) {
        let message = format!(
            "{} does not exist, can't {name} to {}",
            short(source.display()),
            short(destination.display())
        );
        return abort(message, policy, Outcome::Failed);
    }

    let result = (|| -> Result<()> {
        if options.overwrite != Overwrite::Unchecked && (pdest.exists() || pdest.is_symlink()) {
            if options.overwrite == Overwrite::Refuse {
                return Err(Error::ValidationFailed(format!(
                    "{} exists, can't {name}",
                    short(destination.display())
                )));
            }
            do_delete(&pdest)?;
        }

        if let Some(parent) = pdest.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut capitalized = description.clone();
        if let Some(first) = capitalized.get_mut(0..1) {
            first.make_ascii_uppercase();
        }
        hlog(policy.logger, capitalized);

        match &action {
            Action::Copy(ignore) => do_copy(source, &pdest, ignore),
            Action::Move => do_move(source, &pdest),
            Action::Symlink => do_symlink(source, &pdest),
            Action::Compress(ArchiveKind::Zip, arcname) => do_zip(source, &pdest, arcname),
            Action::Compress(kind, arcname) => do_tar(source, &pdest, arcname, *kind),
            Action::Decompress(kind, simplify) => do_extract(source, &pdest, *kind, *simplify),
        }
    })();

    match result {
        Ok(()) => Ok(Outcome::Done),
        Err(Error::ValidationFailed(message)) => abort(message, policy, Outcome::Failed),
        Err(err) => abort(
            format!("Can't {description}: {err}"),
            policy,
            Outcome::Failed,
        ),
    }
}

fn do_copy(source: &Path, destination: &Path, ignore: &[String]) -> Result<()> {
    let metadata = std::fs::symlink_metadata(source)?;
    if metadata.file_type().is_symlink() {
        if destination.exists() || destination.is_symlink() {
            do_delete(destination)?;
        }
        std::os::unix::fs::symlink(std::fs::read_link(source)?, destination)?;
        return Ok(());
    }

    if metadata.is_dir() {
        if !destination.is_dir() {
            if destination.exists() || destination.is_symlink() {
                std::fs::remove_file(destination)?;
            }
            std::fs::create_dir(destination)?;
        }
        for entry in std::fs::read_dir(source)? {
            let entry = entry?;
            let fname = entry.file_name();
            if ignore.iter().any(|i| fname.to_string_lossy() == i.as_str()) {
                continue;
            }
            do_copy(&entry.path(), &destination.join(&fname), ignore)?;
        }
    } else {
        std::fs::copy(source, destination)?;
    }

    // Last modification time is preserved
    std::fs::set_permissions(destination, metadata.permissions())?;
    if let Ok(modified) = metadata.modified() {
        File::open(destination)?.set_modified(modified)?;
    }
    Ok(())
}

fn do_move(source: &Path, destination: &Path) -> Result<()> {
    match std::fs::rename(source, destination) {
        Ok(()) => Ok(()),
        Err(err) if err.raw_os_error() == Some(nix::errno::Errno::EXDEV as i32) => {
            do_copy(source, destination, &[])?;
            do_delete(source)
        }
        Err(err) => Err(err.into()),
    }
}

fn do_symlink(source: &Path, destination: &Path) -> Result<()> {
    let src = resolved_path(source, None);
    let mut target = source.to_path_buf();
    if let Some(dest_parent) = destination.parent() {
        if let Some(src_parent) = src.parent() {
            if src_parent.starts_with(dest_parent) {
                if let Ok(relative) = src.strip_prefix(dest_parent) {
                    target = relative.to_path_buf();
                }
            }
        }
    }
    std::os::unix::fs::symlink(target, destination)?;
    Ok(())
}

fn do_delete(path: &Path) -> Result<()> {
    let metadata = std::fs::symlink_metadata(path)?;
    if metadata.is_dir() {
        std::fs::remove_dir_all(path)?;
    } else {
        std::fs::remove_file(path)?;
    }
    Ok(())
}

fn do_tar(source: &Path, destination: &Path, arcname: &Path, kind: ArchiveKind) -> Result<()> {
    let file = File::create(destination)?;
    match kind {
        ArchiveKind::TarGz => {
            let encoder = GzEncoder::new(file, Compression::default());
            let mut builder = tar::Builder::new(encoder);
            append_to_tar(&mut builder, source, arcname)?;
            builder.into_inner()?.finish()?;
        }
        _ => {
            let mut builder = tar::Builder::new(file);
            append_to_tar(&mut builder, source, arcname)?;
            builder.into_inner()?.flush()?;
        }
    }
    Ok(())
}

fn append_to_tar<W: Write>(builder: &mut tar::Builder<W>, source: &Path, arcname: &Path) -> Result<()> {
    builder.follow_symlinks(false);
    if source.is_dir() {
        builder.append_dir_all(arcname, source)?;
    } else {
        builder.append_path_with_name(source, arcname)?;
    }
    builder.finish()?;
    Ok(())
}

fn do_zip(source: &Path, destination: &Path, arcname: &Path) -> Result<()> {
    let mut zip = ZipWriter::new(File::create(destination)?);
    append_to_zip(&mut zip, source, arcname)?;
    zip.finish()?;
    Ok(())
}

fn append_to_zip(zip: &mut ZipWriter<File>, source: &Path, arcname: &Path) -> Result<()> {
    if source.is_dir() {
        for child in ls_dir(source) {
            let name = child.file_name().map(PathBuf::from).unwrap_or_default();
            append_to_zip(zip, &child, &arcname.join(name))?;
        }
        return Ok(());
    }
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
    zip.start_file(arcname.to_string_lossy(), options)?;
    let mut content = Vec::new();
    File::open(source)?.read_to_end(&mut content)?;
    zip.write_all(&content)?;
    Ok(())
}

fn do_extract(source: &Path, destination: &Path, kind: ArchiveKind, simplify: bool) -> Result<()> {
    let tmp = TempDir::new()?;
    let extracted = tmp.path().join(basename(source, false, false));
    std::fs::create_dir_all(&extracted)?;
    let file = File::open(source)?;
    match kind {
        ArchiveKind::Zip => ZipArchive::new(file)?.extract(&extracted)?,
        ArchiveKind::TarGz => untar(tar::Archive::new(GzDecoder::new(file)), &extracted)?,
        ArchiveKind::Tar => untar(tar::Archive::new(file), &extracted)?,
    }

    let mut extracted_source = extracted;
    if simplify {
        let children = ls_dir(&extracted_source);
        if children.len() == 1 && children[0].is_dir() {
            extracted_source = children[0].clone();
        }
    }
    if destination.exists() || destination.is_symlink() {
        do_delete(destination)?;
    }
    do_move(&extracted_source, destination)
}

fn untar<R: Read>(mut archive: tar::Archive<R>, destination: &Path) -> Result<()> {
    for entry in archive.entries()? {
        let mut entry = entry?;
        let path = entry.path()?.into_owned();
        let escapes = path
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)));
        if escapes {
            return Err(Error::ValidationFailed(format!(
                "Attempted path traversal in archive: {}",
                path.display()
            )));
        }
        entry.unpack_in(destination)?;
    }
    Ok(())
}

/// Delete file or folder `path`.
pub fn delete<P: AsRef<Path>>(path: P, policy: &Policy) -> Result<Outcome> {
    let path = resolved_path(path, None);
    if path.as_os_str().is_empty() || !(path.exists() || path.is_symlink()) {
        return Ok(Outcome::NoOp);
    }

    if hdry(policy, format!("delete {}", short(path.display()))) {
        return Ok(Outcome::Done);
    }

    match do_delete(&path) {
        Ok(()) => {
            hlog(policy.logger, format!("Deleted {}", short(path.display())));
            Ok(Outcome::Done)
        }
        Err(err) => abort(
            format!("Can't delete {}: {err}", short(path.display())),
            policy,
            Outcome::Failed,
        ),
    }
}

/// Ensure folder `path` exists, and is empty when `clean` is set.
pub fn ensure_folder<P: AsRef<Path>>(path: P, clean: bool, policy: &Policy) -> Result<Outcome> {
    let path = resolved_path(path, None);
    if path.as_os_str().is_empty() {
        return Ok(Outcome::NoOp);
    }

    if path.is_dir() {
        if !clean {
            return Ok(Outcome::NoOp);
        }
        let silent = policy.with_logger(crate::Chatter::Silent);
        let mut cleaned = 0;
        for child in ls_dir(&path) {
            if delete(&child, &silent)? == Outcome::Done {
                cleaned += 1;
            }
        }
        if cleaned == 0 {
            return Ok(Outcome::NoOp);
        }
        let message = format!(
            "{} from {}",
            crate::plural(cleaned, "file"),
            short(path.display())
        );
        if !hdry(policy, format!("clean {message}")) {
            hlog(policy.logger, format!("Cleaned {message}"));
        }
        return Ok(Outcome::Done);
    }

    if hdry(policy, format!("create {}", short(path.display()))) {
        return Ok(Outcome::Done);
    }

    match std::fs::create_dir_all(&path) {
        Ok(()) => {
            hlog(policy.logger, format!("Created folder {}", short(path.display())));
            Ok(Outcome::Done)
        }
        Err(err) => abort(
            format!("Can't create folder {}: {err}", short(path.display())),
            policy,
            Outcome::Failed,
        ),
    }
}

/// Write `contents` to file `path`, creating its parent folder if needed.
pub fn write<P: AsRef<Path>, C: AsRef<[u8]>>(
    path: P,
    contents: C,
    policy: &Policy,
) -> Result<Outcome> {
    write_contents(path.as_ref(), Some(contents.as_ref()), policy)
}

/// Create file `path` if it doesn't exist, and update its modification time.
pub fn touch<P: AsRef<Path>>(path: P, policy: &Policy) -> Result<Outcome> {
    write_contents(path.as_ref(), None, policy)
}

fn write_contents(path: &Path, contents: Option<&[u8]>, policy: &Policy) -> Result<Outcome> {
    if path.as_os_str().is_empty() {
        return Ok(Outcome::NoOp);
    }
    let path = resolved_path(path, None);
    let byte_size = contents
        .filter(|c| !c.is_empty())
        .map(|c| represented_bytesize(c.len() as f64, "bytes"));
    let target = short(path.display());
    let dryrun_message = match &byte_size {
        Some(size) => format!("write {size} to {target}"),
        None => format!("touch {target}"),
    };
    if hdry(policy, dryrun_message) {
        return Ok(Outcome::Done);
    }

    let result = (|| -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        match contents {
            Some(contents) => std::fs::write(&path, contents)?,
            None => {
                let file = OpenOptions::new().create(true).append(true).open(&path)?;
                file.set_modified(SystemTime::now())?;
            }
        }
        Ok(())
    })();

    match result {
        Ok(()) => {
            let message = match &byte_size {
                Some(size) => format!("Wrote {size} to {target}"),
                None => format!("Touched {target}"),
            };
            hlog(policy.logger, message);
            Ok(Outcome::Done)
        }
        Err(err) => abort(
            format!("Can't write to {target}: {err}"),
            policy,
            Outcome::Failed,
        ),
    }
}

/// Base name of `path`, without its extension when `strip_extension` is set.
pub fn basename<P: AsRef<Path>>(path: P, strip_extension: bool, follow: bool) -> String {
    let mut path = path.as_ref().to_path_buf();
    if follow {
        if let Ok(real) = dunce::canonicalize(&path) {
            path = real;
        }
    }
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    if strip_extension {
        if let Some((pre, _)) = name.rsplit_once('.') {
            if !pre.is_empty() {
                return pre.to_string();
            }
        }
    }
    name
}

/// Hash algorithms supported by [`checksum`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Hash {
    Sha224,
    #[default]
    Sha256,
    Sha384,
    Sha512,
}

/// Hex digest of the contents of file `path`.
pub fn checksum<P: AsRef<Path>>(path: P, hash: Hash) -> Result<String> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|error| Error::ReadFailed {
        path: path.to_path_buf(),
        error,
    })?;
    match hash {
        Hash::Sha224 => hex_digest::<Sha224>(file),
        Hash::Sha256 => hex_digest::<Sha256>(file),
        Hash::Sha384 => hex_digest::<Sha384>(file),
        Hash::Sha512 => hex_digest::<Sha512>(file),
    }
}

fn hex_digest<D: Digest>(file: File) -> Result<String> {
    let mut hasher = D::new();
    let mut reader = BufReader::with_capacity(65536, file);
    loop {
        let buf = reader.fill_buf()?;
        if buf.is_empty() {
            break;
        }
        let len = buf.len();
        hasher.update(buf);
        reader.consume(len);
    }
    Ok(hasher
        .finalize()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect())
}

/// Total size in bytes of given files and folders, symlinks are not followed.
pub fn filesize<I, P>(paths: I) -> u64
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let mut size = 0;
    for path in paths {
        let path = path.as_ref();
        let Ok(metadata) = std::fs::symlink_metadata(path) else {
            continue;
        };
        if metadata.is_dir() {
            size += filesize(ls_dir(path));
        } else if metadata.is_file() {
            size += metadata.len();
        }
    }
    size
}

/// Sections of an ini file: section name -> key -> value.
///
/// Definitions appearing before any section are under the `""` section.
pub type IniMap = BTreeMap<String, BTreeMap<String, String>>;

/// Contents of ini-style config file `path`.
///
/// `#` starts a comment. Sections without any definition never appear.
/// Unless `keep_empty` is set, definitions with an empty key or value are
/// dropped, along with the `""` section and sections left empty.
pub fn ini_to_dict<P: AsRef<Path>>(path: P, keep_empty: bool, policy: &Policy) -> Result<IniMap> {
    let mut result = IniMap::new();
    let mut section_key = String::new();
    for line in readlines(path, None, policy)? {
        let line = line.split('#').next().unwrap_or_default().trim();
        if line.is_empty() {
            continue;
        }
        if line.starts_with('[') && line.ends_with(']') {
            section_key = line.trim_matches(['[', ']']).trim().to_string();
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let (key, value) = (key.trim(), value.trim());
        let section = result.entry(section_key.clone()).or_default();
        if keep_empty || (!key.is_empty() && !value.is_empty()) {
            section.insert(key.to_string(), value.to_string());
        }
    }
    if !keep_empty {
        result.retain(|k, v| !k.is_empty() && !v.is_empty());
    }
    Ok(result)
}

/// True if `path` is `root_folder` or lives under it.
pub fn is_subfolder<P: AsRef<Path>, R: AsRef<Path>>(path: P, root_folder: R) -> bool {
    let path = resolved_path(path, None);
    let root = resolved_path(root_folder, None);
    !root.as_os_str().is_empty() && path.starts_with(root)
}

/// True if file `path` exists and was modified less than `age` ago.
pub fn is_younger<P: AsRef<Path>>(path: P, age: Duration) -> bool {
    if age.is_zero() {
        return false;
    }
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|modified| SystemTime::now().duration_since(modified).ok())
        .is_some_and(|elapsed| elapsed < age)
}

/// Sorted contents of folder `path`, empty when it is not a folder.
pub fn ls_dir<P: AsRef<Path>>(path: P) -> Vec<PathBuf> {
    let mut result: Vec<PathBuf> = std::fs::read_dir(path)
        .map(|entries| entries.filter_map(|e| e.ok().map(|e| e.path())).collect())
        .unwrap_or_default();
    result.sort();
    result
}

/// Absolute path of the parent folder of `path`.
pub fn parent_folder<P: AsRef<Path>>(path: P, base: Option<&Path>) -> PathBuf {
    let path = resolved_path(path, base);
    path.parent().map(Path::to_path_buf).unwrap_or(path)
}

/// Lines of file `path`, with trailing whitespace removed.
///
/// Only the `first` lines are returned when specified. A file that can't be
/// read yields no lines when `policy` is not fatal.
pub fn readlines<P: AsRef<Path>>(path: P, first: Option<usize>, policy: &Policy) -> Result<Vec<String>> {
    let path = resolved_path(path, None);
    let content = match std::fs::read(&path) {
        Ok(content) => content,
        Err(err) => {
            let message = format!("Can't read {}: {err}", short(path.display()));
            return abort(message, policy, Vec::new());
        }
    };
    let text = String::from_utf8_lossy(&content);
    let lines = text.lines().map(|line| line.trim_end().to_string());
    Ok(match first {
        Some(first) => lines.take(first).collect(),
        None => lines.collect(),
    })
}

/// `text` as a path, with `~` expanded.
pub fn to_path(text: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(text).as_ref())
}

/// A temporary folder, deleted when dropped.
///
/// By default the folder is anchored (paths under it are shown relative to
/// it) and becomes the current working folder until dropped. In dry-run mode
/// no folder is created, and [`TempFolder::path`] is the symbolic `<tmp>`.
#[derive(Debug)]
pub struct TempFolder {
    dir: Option<TempDir>,
    path: PathBuf,
    anchor: bool,
    old_cwd: Option<PathBuf>,
    prior_dryrun: Option<bool>,
}

impl TempFolder {
    /// Anchored temp folder, which becomes the current working folder.
    pub fn new() -> Result<Self> {
        Self::with_options(true, true, None)
    }

    /// Temp folder, optionally anchored, optionally becoming the current
    /// working folder, with dry-run mode optionally overridden while it lives.
    pub fn with_options(anchor: bool, follow: bool, dryrun: Option<bool>) -> Result<Self> {
        let prior_dryrun = dryrun.map(crate::set_dryrun);
        let mut folder = Self {
            dir: None,
            path: PathBuf::from(SYMBOLIC_TMP),
            anchor,
            old_cwd: None,
            prior_dryrun,
        };
        if !crate::is_dryrun() {
            let dir = TempDir::new()?;
            folder.path = dunce::canonicalize(dir.path())?;
            folder.dir = Some(dir);
            if follow {
                folder.old_cwd = Some(std::env::current_dir()?);
                std::env::set_current_dir(&folder.path)?;
            }
        }
        if anchor {
            Anchored::add([&folder.path]);
        }
        Ok(folder)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempFolder {
    fn drop(&mut self) {
        if let Some(prior) = self.prior_dryrun {
            crate::set_dryrun(prior);
        }
        if self.anchor {
            Anchored::pop([&self.path]);
        }
        if let Some(old_cwd) = self.old_cwd.take() {
            if let Err(err) = std::env::set_current_dir(&old_cwd) {
                tracing::warn!("Can't restore working folder {}: {err}", old_cwd.display());
            }
        }
        // Dropping the TempDir removes the folder
        self.dir.take();
    }
}

/// Current working folder changed to `destination` until dropped.
#[derive(Debug)]
pub struct CurrentFolder {
    destination: PathBuf,
    previous: Option<PathBuf>,
    anchor: bool,
}

impl CurrentFolder {
    pub fn new<P: AsRef<Path>>(destination: P, anchor: bool) -> Result<Self> {
        let destination = resolved_path(destination, None);
        let mut previous = None;
        if !crate::is_dryrun() || destination.exists() {
            previous = Some(std::env::current_dir()?);
            std::env::set_current_dir(&destination)?;
        }
        if anchor {
            Anchored::add([&destination]);
        }
        Ok(Self {
            destination,
            previous,
            anchor,
        })
    }
}

impl Drop for CurrentFolder {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            if let Err(err) = std::env::set_current_dir(&previous) {
                tracing::warn!("Can't restore working folder {}: {err}", previous.display());
            }
        }
        if self.anchor {
            Anchored::pop([&self.destination]);
        }
    }
}
