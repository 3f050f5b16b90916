use std::io::Write;
use std::sync::{Arc, Mutex, MutexGuard};

use agent_provider::{CancelReason, CancelSignal};
use agent_transcript::{Session, Submission, TurnEnd};
use anyhow::Context;
use tracing::debug;

use crate::backend::{Backend, Provisioned};
use crate::commands::{parse_slash_command, SlashCommand, HELP_TEXT};
use crate::config::ChatSettings;
use crate::progress::render_event;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Continue,
    Exit,
}

/// Aborts the turn in flight from outside the input loop (Ctrl-C).
#[derive(Debug, Clone, Default)]
pub struct InterruptHandle {
    active: Arc<Mutex<Option<CancelSignal>>>,
}

impl InterruptHandle {
    /// Returns false when no turn is running.
    pub fn interrupt(&self) -> bool {
        match lock_unpoisoned(&self.active).take() {
            Some(signal) => signal.cancel(CancelReason::UserAbort),
            None => false,
        }
    }

    fn arm(&self, signal: CancelSignal) {
        *lock_unpoisoned(&self.active) = Some(signal);
    }

    fn disarm(&self) {
        lock_unpoisoned(&self.active).take();
    }
}

pub struct ChatApp {
    session: Session,
    backend: Backend,
    instance: Option<Provisioned>,
    interrupt: InterruptHandle,
}

impl ChatApp {
    pub fn new(session: Session, backend: Backend) -> Self {
        Self {
            session,
            backend,
            instance: None,
            interrupt: InterruptHandle::default(),
        }
    }

    /// Builds the session and provisions its instance.
    pub async fn start<W: Write>(
        settings: &ChatSettings,
        backend: Backend,
        out: &mut W,
    ) -> anyhow::Result<Self> {
        let session = Session::new(settings.session_config()?).with_monitor(backend.monitor());
        let mut app = Self::new(session, backend);

        writeln!(out, "Starting {} instance...", settings.instance_type)?;
        let provisioned = app
            .backend
            .provision(settings.instance_type, settings.instance_id.as_deref())
            .await?;
        app.attach(provisioned, out)?;
        Ok(app)
    }

    pub fn attach<W: Write>(&mut self, provisioned: Provisioned, out: &mut W) -> anyhow::Result<()> {
        writeln!(out, "Instance {} is ready.", provisioned.instance_id)?;
        if let Some(stream_url) = &provisioned.stream_url {
            writeln!(out, "Stream URL: {stream_url}")?;
        }
        writeln!(out, "Type /help for commands. Ctrl-C stops a running response.")?;
        self.session.attach_instance(provisioned.instance_id.clone());
        self.instance = Some(provisioned);
        Ok(())
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    pub fn interrupt_handle(&self) -> InterruptHandle {
        self.interrupt.clone()
    }

    pub async fn handle_line<W: Write>(&mut self, line: &str, out: &mut W) -> anyhow::Result<Control> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(Control::Continue);
        }

        let Some(command) = parse_slash_command(line) else {
            self.run_turn(line, out).await?;
            return Ok(Control::Continue);
        };

        match command {
            SlashCommand::Help => writeln!(out, "{HELP_TEXT}")?,
            SlashCommand::Reset => match self.session.reset() {
                Ok(()) => writeln!(out, "Conversation cleared.")?,
                Err(error) => writeln!(out, "! {error}")?,
            },
            SlashCommand::Stop => match self.session.stop_instance() {
                Some(instance_id) => {
                    self.instance = None;
                    self.backend.release(&instance_id).await;
                    writeln!(out, "Instance {instance_id} stopped.")?;
                }
                None => writeln!(out, "! No instance is attached.")?,
            },
            SlashCommand::Quit => return Ok(Control::Exit),
            SlashCommand::Unknown(command) => {
                writeln!(out, "! Unknown command {command}. Try /help.")?
            }
        }
        Ok(Control::Continue)
    }

    async fn run_turn<W: Write>(&mut self, text: &str, out: &mut W) -> anyhow::Result<()> {
        let turn = match self.session.begin_turn(text) {
            Ok(Submission::Started(turn)) => turn,
            Ok(Submission::Stopped) => return Ok(()),
            Err(error) => {
                writeln!(out, "! {error}")?;
                return Ok(());
            }
        };

        self.interrupt.arm(turn.cancel_signal());
        let mut source = self.backend.open(&turn, self.session.mode()).await;

        let mut write_error = None;
        let outcome = self
            .session
            .consume(turn, &mut source, &mut |event| {
                if write_error.is_some() {
                    return;
                }
                for line in render_event(&event) {
                    if let Err(error) = writeln!(out, "{line}") {
                        write_error = Some(error);
                        break;
                    }
                }
            })
            .await;

        self.interrupt.disarm();
        source.finish();
        if let Some(error) = write_error {
            return Err(error).context("failed to write progress");
        }

        debug!(end = ?outcome.end, appended = outcome.appended, "turn finished");
        if outcome.end == TurnEnd::Cancelled(CancelReason::InstanceTerminated) {
            writeln!(out, "! The instance is no longer running. Use /stop and restart.")?;
        }
        Ok(())
    }

    /// Aborts any turn and stops the instance if this process started it.
    pub async fn shutdown<W: Write>(&mut self, out: &mut W) -> anyhow::Result<()> {
        self.session.abort();
        if let Some(instance) = self.instance.take().filter(|instance| instance.owned) {
            writeln!(out, "Stopping instance {}...", instance.instance_id)?;
            self.backend.release(&instance.instance_id).await;
        }
        Ok(())
    }
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
