use clap::Parser;
use std::path::PathBuf;

/// Pack a bootloader and host files into an extent file system image
#[derive(Parser)]
#[command(version, about)]
pub struct Cli {
    /// Output image file
    pub image_name: PathBuf,

    /// Bootloader binary placed in block 0
    #[arg(long, short, default_value = "boot/bootloader.bin")]
    pub bootloader: PathBuf,

    /// Host file copied into the root directory, may be repeated
    #[arg(
        long = "file",
        short = 'f',
        default_values = ["bin/kernel.bin", "bin/test.txt", "bin/pr1.o"]
    )]
    pub files: Vec<PathBuf>,
}
