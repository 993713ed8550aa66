use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Cursor};
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use log::{error, info};
use scrinium::{
    ArchiveReader, ArchiveWriter, CpioError, CpioHeader, Device, Endian, FileIdentity, Identity,
    Metadata, Variant, mode_string,
};
use thiserror::Error;

use clap::builder::styling::*;
pub fn styles() -> clap::builder::Styles {
    Styles::styled()
        .header(AnsiColor::Green.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Cyan.on_default())
        .error(AnsiColor::Red.on_default() | Effects::BOLD)
        .valid(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .invalid(AnsiColor::Yellow.on_default() | Effects::BOLD)
}

#[derive(Copy, Clone, ValueEnum)]
enum Format {
    /// New ASCII, "SVR4"
    Newc,
    /// Old binary
    Bin,
}

#[derive(Copy, Clone, ValueEnum)]
enum ByteOrder {
    Native,
    Little,
    Big,
}

/// tool to list and create cpio archives
#[derive(Parser)]
#[command(author,
          version,
          name = "scrinium",
          max_term_width = 98,
          styles = styles(),
)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List every entry of an archive
    List {
        /// CPIO path
        archive: PathBuf,

        /// Skip BYTES at the start of ARCHIVE
        #[arg(short, long, default_value_t = 0, name = "BYTES")]
        offset: u64,

        /// Print every header field
        #[arg(long)]
        fields: bool,
    },
    /// Create an archive from files, directories and symlinks
    Create {
        /// Output path
        output: PathBuf,

        #[arg(short, long, value_enum, default_value_t = Format::Newc)]
        format: Format,

        /// Byte order of old binary headers
        #[arg(short, long, value_enum, default_value_t = ByteOrder::Native)]
        endian: ByteOrder,

        /// Directories are added with everything below them
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
}

#[derive(Error, Debug)]
enum CliError {
    #[error(transparent)]
    Cpio(#[from] CpioError),

    #[error("{}: {source}", .path.display())]
    Io { path: PathBuf, source: std::io::Error },
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    let result = match args.command {
        Command::List { archive, offset, fields } => list(&archive, offset, fields),
        Command::Create { output, format, endian, paths } => {
            let variant = match (format, endian) {
                (Format::Newc, _) => Variant::NewAscii,
                (Format::Bin, ByteOrder::Native) => Variant::old_binary(),
                (Format::Bin, ByteOrder::Little) => Variant::OldBinary(Endian::Little),
                (Format::Bin, ByteOrder::Big) => Variant::OldBinary(Endian::Big),
            };
            create(&output, variant, &paths)
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn list(archive: &Path, offset: u64, fields: bool) -> Result<(), CliError> {
    let file = File::open(archive)
        .map_err(|source| CliError::Io { path: archive.to_path_buf(), source })?;
    let reader = ArchiveReader::from_reader_with_offset(BufReader::new(file), offset)?;

    // first name seen for each identity
    let mut seen: HashMap<Identity, String> = HashMap::new();
    for entry in reader {
        let entry = entry?;
        if entry.is_trailer() {
            break;
        }
        let header = entry.header();
        let mut line = format!(
            "{} {:>3} {:>5} {:>5} {:>10} {:>10} {}",
            mode_string(header.mode()),
            header.nlink(),
            header.uid(),
            header.gid(),
            header.filesize(),
            header.mtime(),
            entry.name(),
        );
        match seen.get(&header.identity()) {
            Some(first) => line.push_str(&format!(" link to {first}")),
            None => {
                seen.insert(header.identity(), entry.name().to_string());
            }
        }
        println!("{line}");

        if fields {
            for (name, value) in header.fields() {
                println!("    {name:<10} {value:#010x}");
            }
        }
    }
    Ok(())
}

fn create(output: &Path, variant: Variant, paths: &[PathBuf]) -> Result<(), CliError> {
    let file = File::create(output)
        .map_err(|source| CliError::Io { path: output.to_path_buf(), source })?;
    let mut writer = ArchiveWriter::new(BufWriter::new(file), variant);
    for path in paths {
        add(&mut writer, path)?;
    }
    writer.finish()?;
    info!("wrote {}", output.display());
    Ok(())
}

fn add<W: std::io::Write>(writer: &mut ArchiveWriter<W>, path: &Path) -> Result<(), CliError> {
    let io = |source| CliError::Io { path: path.to_path_buf(), source };
    let stat = fs::symlink_metadata(path).map_err(io)?;
    let name = path.as_os_str().as_bytes();
    let shown = path.display();

    let rdev = stat.rdev();
    let metadata = Metadata {
        mode: stat.mode(),
        uid: stat.uid(),
        gid: stat.gid(),
        nlink: u32::try_from(stat.nlink()).unwrap_or(u32::MAX),
        mtime: u32::try_from(stat.mtime()).unwrap_or(0),
        rdev: Device::new(
            (((rdev >> 8) & 0xfff) | ((rdev >> 32) & !0xfff)) as u32,
            ((rdev & 0xff) | ((rdev >> 12) & !0xff)) as u32,
        ),
        identity: Some(FileIdentity::Source { dev: stat.dev(), ino: stat.ino() }),
    };

    let file_type = stat.file_type();
    if file_type.is_symlink() {
        let target = fs::read_link(path).map_err(io)?;
        info!("adding {shown} -> {}", target.display());
        writer.push_file(name, &metadata, Cursor::new(target.as_os_str().as_bytes()))?;
    } else if file_type.is_file() {
        info!("adding {shown}");
        let file = File::open(path).map_err(io)?;
        writer.push_file(name, &metadata, BufReader::new(file))?;
    } else {
        info!("adding {shown}");
        writer.push_empty(name, &metadata)?;
    }

    if file_type.is_dir() {
        let mut children = fs::read_dir(path)
            .map_err(io)?
            .map(|e| e.map(|e| e.path()))
            .collect::<Result<Vec<_>, _>>()
            .map_err(io)?;
        children.sort();
        for child in children {
            add(writer, &child)?;
        }
    }
    Ok(())
}
