mod cli;

use std::process::ExitCode;

use clap::Parser;
use cli::Cli;

fn main() -> ExitCode {
    env_logger::init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        // --help 与 --version 也以错误的形式返回
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };
    log::info!(
        "bootloader={:?} files={:?} image={:?}",
        cli.bootloader,
        cli.files,
        cli.image_name
    );

    match extent_fs_fuse::create_disk_image(
        &cli.bootloader,
        &cli.files,
        &cli.image_name,
        extent_fs_fuse::now(),
    ) {
        Ok(layout) => {
            println!(
                "{}: {} blocks, {} inodes",
                cli.image_name.display(),
                layout.total_blocks(),
                layout.super_block.total_inodes
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("{e}");
            eprintln!("create_disk_image: {e}");
            ExitCode::FAILURE
        }
    }
}
