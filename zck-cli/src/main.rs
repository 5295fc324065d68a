use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use memmap2::Mmap;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use zck_core::annotations::{read_footer_from_annotations, Annotations};
use zck_core::digest::canonical_digest;
use zck_core::reader::{self, ReadLimits};
use zck_core::toc::{FileMetadata, Toc};
use zck_core::writer::{write_zstd_chunked_manifest, TarSplitData};
use zck_core::DEFAULT_COMPRESSION_LEVEL;

#[derive(Parser)]
#[command(name="zck", version, about="zstd:chunked layer metadata tool")]
struct Cli {
    #[command(subcommand)] cmd: Cmd,
    /// Max compressed manifest / tar-split size accepted when reading
    #[arg(long, global = true)] max_compressed: Option<u64>,
    /// Max uncompressed manifest size accepted when reading
    #[arg(long, global = true)] max_uncompressed: Option<u64>,
}

#[derive(Subcommand)]
enum Cmd {
    /// Append TOC, tar-split and footer frames to a layer blob
    Write {
        /// TOC object or bare array of entries (JSON)
        #[arg(long)] entries: PathBuf,
        /// Compressed tar-split payload
        #[arg(long)] tar_split: PathBuf,
        /// Uncompressed tar-split size (computed by decompressing if omitted)
        #[arg(long)] tar_split_size: Option<u64>,
        /// Tar-split digest (sha256 of the payload if omitted)
        #[arg(long)] tar_split_digest: Option<String>,
        #[arg(long, default_value_t = DEFAULT_COMPRESSION_LEVEL)] level: i32,
        /// Where to write the annotations (stdout if omitted)
        #[arg(long)] annotations: Option<PathBuf>,
        blob: PathBuf,
    },
    /// Decode the footer at the end of a blob
    Footer { blob: PathBuf },
    /// Rebuild the footer from an annotations file
    Annotations { annotations: PathBuf },
    /// Print the TOC of a blob
    Toc {
        #[arg(long)] annotations: Option<PathBuf>,
        blob: PathBuf,
    },
    /// Cross-check blob footer, annotations and digests
    Check {
        #[arg(long)] annotations: PathBuf,
        blob: PathBuf,
    },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum EntriesFile {
    Toc(Toc),
    List(Vec<FileMetadata>),
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    let mut limits = ReadLimits::default();
    if let Some(n) = cli.max_compressed { limits.max_compressed_bytes = n; }
    if let Some(n) = cli.max_uncompressed { limits.max_uncompressed_bytes = n; }
    match cli.cmd {
        Cmd::Write { entries, tar_split, tar_split_size, tar_split_digest, level, annotations, blob } => {
            write(&entries, &tar_split, tar_split_size, tar_split_digest, level, annotations.as_deref(), &blob)?;
        }
        Cmd::Footer { blob } => footer(&blob)?,
        Cmd::Annotations { annotations } => print_json(&read_footer_from_annotations(&load_annotations(&annotations)?)?)?,
        Cmd::Toc { annotations, blob } => toc(&blob, annotations.as_deref(), &limits)?,
        Cmd::Check { annotations, blob } => check(&blob, &annotations, &limits)?,
    }
    Ok(())
}

fn print_json<T: Serialize>(v: &T) -> Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    serde_json::to_writer_pretty(&mut out, v)?;
    writeln!(out)?;
    Ok(())
}

fn load_annotations(path: &Path) -> Result<Annotations> {
    let f = File::open(path).with_context(|| format!("open {}", path.display()))?;
    serde_json::from_reader(f).with_context(|| format!("parse annotations {}", path.display()))
}

fn map_blob(path: &Path) -> Result<Mmap> {
    let f = File::open(path).with_context(|| format!("open {}", path.display()))?;
    // SAFETY: the blob is only read; concurrent truncation by another process is not supported.
    let map = unsafe { Mmap::map(&f) }.with_context(|| format!("mmap {}", path.display()))?;
    Ok(map)
}

fn write(entries_path: &Path, tar_split_path: &Path, tar_split_size: Option<u64>, tar_split_digest: Option<String>, level: i32, annotations_out: Option<&Path>, blob: &Path) -> Result<()> {
    let entries = match serde_json::from_reader(File::open(entries_path).with_context(|| format!("open {}", entries_path.display()))?)
        .with_context(|| format!("parse entries {}", entries_path.display()))?
    {
        EntriesFile::Toc(toc) => toc.entries,
        EntriesFile::List(v) => v,
    };
    Toc::new(entries.clone()).validate()?;

    let data = fs::read(tar_split_path).with_context(|| format!("read {}", tar_split_path.display()))?;
    let uncompressed_size = match tar_split_size {
        Some(n) => n,
        None => zstd::stream::decode_all(&data[..]).context("zstd decompress tar-split")?.len() as u64,
    };
    let digest = tar_split_digest.unwrap_or_else(|| canonical_digest(&data));
    let ts = TarSplitData { data, digest, uncompressed_size };

    let f = OpenOptions::new().create(true).append(true).open(blob).with_context(|| format!("open {}", blob.display()))?;
    let offset = f.metadata()?.len();
    let mut annotations = Annotations::new();
    let mut w = BufWriter::new(&f);
    let res = write_zstd_chunked_manifest(&mut w, &mut annotations, offset, &ts, &entries, level)
        .map_err(anyhow::Error::from)
        .and_then(|_| w.flush().map_err(anyhow::Error::from));
    drop(w);
    if let Err(e) = res {
        return Err(rollback(&f, offset, e).context(format!("write metadata to {}", blob.display())));
    }
    f.sync_all()?;
    log::info!("appended metadata for {} entries at offset {}", entries.len(), offset);

    match annotations_out {
        Some(p) => {
            serde_json::to_writer_pretty(File::create(p).with_context(|| format!("create {}", p.display()))?, &annotations)?;
            eprintln!("Wrote {} ({} entries) and {}", blob.display(), entries.len(), p.display());
        }
        None => print_json(&annotations)?,
    }
    Ok(())
}

/// Truncate `f` back to `offset` after a failed append. A failed truncate is
/// attached to `err` since the blob then still holds partial frames.
fn rollback(f: &File, offset: u64, err: anyhow::Error) -> anyhow::Error {
    match f.set_len(offset) {
        Ok(()) => err,
        Err(t) => {
            log::error!("truncate back to {} bytes failed: {}", offset, t);
            err.context(format!("blob left with partial frames past offset {offset}: truncate failed: {t}"))
        }
    }
}

fn footer(blob: &Path) -> Result<()> {
    let map = map_blob(blob)?;
    let f = reader::read_footer_from_blob(&map).with_context(|| format!("read footer of {}", blob.display()))?;
    print_json(&f)
}

fn toc(blob: &Path, annotations: Option<&Path>, limits: &ReadLimits) -> Result<()> {
    let ann = annotations.map(load_annotations).transpose()?;
    let map = map_blob(blob)?;
    let layer = reader::open_layer(&map, ann.as_ref(), limits).with_context(|| format!("open layer {}", blob.display()))?;
    print_json(&layer.toc)
}

fn check(blob: &Path, annotations: &Path, limits: &ReadLimits) -> Result<()> {
    let ann = load_annotations(annotations)?;
    let map = map_blob(blob)?;
    let from_tail = reader::read_footer_from_blob(&map).context("footer from blob")?;
    let from_ann = read_footer_from_annotations(&ann).context("footer from annotations")?;
    if from_ann.without_checksums() != from_tail {
        eprintln!("blob footer:       {:?}", from_tail);
        eprintln!("annotation footer: {:?}", from_ann.without_checksums());
        bail!("footer mismatch between blob and annotations");
    }
    let layer = reader::open_layer(&map, Some(&ann), limits)?;
    let tail_toc = reader::read_manifest(&map, &from_tail, limits)?;
    if tail_toc != layer.toc {
        return Err(anyhow!("TOC differs between recovery paths"));
    }
    eprintln!("Entries: {}; tar-split: {} bytes", layer.toc.entries.len(), layer.tar_split.map_or(0, |t| t.len()));
    println!("OK");
    Ok(())
}
