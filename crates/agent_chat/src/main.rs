use std::io::{self, Write};

use agent_chat::app::{ChatApp, Control};
use agent_chat::backend::{provider_id_from_env, Backend};
use agent_chat::config::{ChatSettings, CONFIG_PATH_ENV_VAR};
use agent_chat::logging;
use agent_provider_http::HTTP_PROVIDER_ID;
use anyhow::{bail, Context};
use tokio::io::{AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    let provider_id = provider_id_from_env();
    let settings = match ChatSettings::from_env()? {
        Some(settings) => settings,
        None if provider_id == HTTP_PROVIDER_ID => {
            bail!("{CONFIG_PATH_ENV_VAR} must name a settings file for the http provider")
        }
        None => ChatSettings::offline(),
    };
    let backend = Backend::for_id(&provider_id, &settings)?;

    let mut stdout = io::stdout();
    let mut app = ChatApp::start(&settings, backend, &mut stdout).await?;

    let interrupt = app.interrupt_handle();
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            interrupt.interrupt();
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        write!(stdout, "> ")?;
        stdout.flush()?;

        // Ctrl-C at the prompt exits; during a turn it only stops the turn.
        let line = tokio::select! {
            line = lines.next_line() => line.context("failed to read input")?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            writeln!(stdout)?;
            break;
        };

        if app.handle_line(&line, &mut stdout).await? == Control::Exit {
            break;
        }
    }

    app.shutdown(&mut stdout).await
}
