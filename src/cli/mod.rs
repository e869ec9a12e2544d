// CLI module for tagscout
//
// Compiled into the binary only; the library does not use it.

pub mod commands;
pub mod config;
pub mod output;

pub use config::{Commands, Config};
pub use output::OutputFormatter;

/// Run the parsed command line
pub fn run(config: Config) -> anyhow::Result<()> {
    let options = config.read_options();
    let formatter = OutputFormatter::new(config.format, config.quiet);

    match &config.command {
        Commands::Read { files, fields, images, output } => commands::command_read(
            files,
            fields.as_deref(),
            *images,
            output.as_deref(),
            &options,
            &formatter,
        ),
        Commands::Detect { files } => commands::command_detect(files, &formatter),
        Commands::Info { files, detailed } => {
            commands::command_info(files, *detailed, &options, &formatter)
        }
        Commands::ExportCover { file, output, index } => {
            commands::command_export_cover(file, output, *index, &formatter)
        }
        Commands::Scan { directory, dump, durations } => commands::command_scan(
            directory,
            dump.as_deref(),
            durations.as_deref(),
            &options,
            &formatter,
        ),
    }
}
