//! Interactive editing over stdin.

use std::io::{self, BufRead, Write};

use corpusedit_common::config::AppConfig;
use corpusedit_dataset::Exporter;

use crate::session::{Reply, Session};

pub fn run(config: &AppConfig, files: &[String]) -> anyhow::Result<()> {
    let dataset = super::load(config, files)?;
    let exporter = Exporter::new(config.output_dir(), config.corpus.output_suffix.clone())
        .with_batch_size(config.corpus.read_batch_size);
    let mut session = Session::new(dataset, exporter);

    println!("{}", session.render_current()?);
    println!("Type 'help' for commands.");

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut line = String::new();
    loop {
        print!("{}> ", session.prompt());
        io::stdout().flush()?;

        line.clear();
        if input.read_line(&mut line)? == 0 {
            break;
        }

        match session.execute(&line) {
            Ok(Reply::Continue(message)) => {
                if !message.is_empty() {
                    println!("{message}");
                }
            }
            Ok(Reply::Quit(message)) => {
                println!("{message}");
                return Ok(());
            }
            Err(e) if e.is_user_error() => println!("{e}"),
            Err(e) => {
                tracing::error!(error = %e, "Command failed");
                println!("Error: {e}");
            }
        }
    }

    if session.has_unsaved_changes() {
        tracing::warn!(
            modified = session.dataset().modified_count(),
            deleted = session.dataset().deleted_count(),
            "Input closed with unsaved changes"
        );
    }
    Ok(())
}
