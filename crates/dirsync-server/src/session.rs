//! Per-connection session: handshake, command dispatch, sub-protocols.
//!
//! A session is one sequential unit of work. The loop waits on either the
//! next input line or a fixed-interval tick that drains watch events for
//! the session's subscriptions; commands never run concurrently within a
//! session, and the `sync`/`log` sub-protocols read their extra lines
//! inline as part of the same unit.
//!
//! Lifecycle: `Authenticating → Active → Closing → Closed`. A rejected
//! handshake answers with an empty line and never reaches Active; any
//! transport failure is an implicit `quit`.

use std::path::Path;
use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, Lines};

use dirsync_fs::{FsError, FsResult, Sandbox};
use dirsync_proto::Command;

use crate::constants::WATCH_DRAIN_INTERVAL;
use crate::oplog::{CommandLog, OpKind};
use crate::registry::Registry;
use crate::sync::SyncEngine;

/// Session-private state: sandbox, command log, undo stack, subscriptions.
struct Session {
    name: String,
    letter: char,
    sandbox: Sandbox,
    log: CommandLog,
    undo: Vec<String>,
    sync: SyncEngine,
}

/// Drive one connection from handshake to close.
///
/// Claims an identity from the shared registry, serves the command loop,
/// and releases the identity on the way out, including on transport
/// failure, which is treated as an implicit `quit`.
pub async fn run<S>(stream: S, registry: Arc<Registry>, root: &Path) -> std::io::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (read_half, mut writer) = tokio::io::split(stream);
    let mut lines = BufReader::new(read_half).lines();

    // Authenticating: first line is the requested identity name.
    let Some(line) = lines.next_line().await? else {
        return Ok(());
    };
    let name = line.trim().to_string();
    let Some(letter) = registry.claim(&name) else {
        tracing::info!(user = %name, "identity rejected");
        send(&mut writer, "").await?;
        return Ok(());
    };

    let mut session = match Session::new(root, &name, letter) {
        Ok(session) => session,
        Err(error) => {
            tracing::error!(user = %name, %error, "sandbox setup failed");
            registry.release(&name);
            send(&mut writer, "").await?;
            return Ok(());
        }
    };
    tracing::info!(user = %name, letter = %letter, users = ?registry.active(), "connected");
    if let Err(error) = send(&mut writer, &letter.to_string()).await {
        registry.release(&name);
        return Err(error);
    }

    let result = session.serve(&mut lines, &mut writer).await;
    registry.release(&name);
    tracing::info!(user = %name, users = ?registry.active(), "disconnected");
    result
}

/// Write one line to the peer.
async fn send<W: AsyncWrite + Unpin>(writer: &mut W, line: &str) -> std::io::Result<()> {
    writer.write_all(line.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await
}

impl Session {
    fn new(root: &Path, name: &str, letter: char) -> FsResult<Self> {
        let sandbox = Sandbox::create(root, name)?;
        let sync = SyncEngine::new(sandbox.home());
        Ok(Self {
            name: name.to_string(),
            letter,
            sandbox,
            log: CommandLog::new(),
            undo: Vec::new(),
            sync,
        })
    }

    /// Active state: alternate between input lines and watch drains until
    /// the session closes.
    async fn serve<R, W>(&mut self, lines: &mut Lines<R>, writer: &mut W) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut tick = tokio::time::interval(WATCH_DRAIN_INTERVAL);
        loop {
            tokio::select! {
                line = lines.next_line() => {
                    match line? {
                        // EOF: the transport went away, implicit quit.
                        None => break,
                        Some(line) => {
                            if !self.handle_line(line.trim(), lines, writer).await? {
                                break;
                            }
                        }
                    }
                }
                _ = tick.tick() => {
                    for frame in self.sync.drain() {
                        send(writer, &frame.to_string()).await?;
                    }
                }
            }
        }
        // Closing: terminal frame, then the caller releases the identity.
        send(writer, "quit").await
    }

    /// Dispatch one command line. Returns `false` when the session should
    /// move to Closing.
    async fn handle_line<R, W>(
        &mut self,
        line: &str,
        lines: &mut Lines<R>,
        writer: &mut W,
    ) -> std::io::Result<bool>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        tracing::info!(user = %self.name, letter = %self.letter, command = %line);
        let command = match Command::parse(line) {
            Ok(command) => command,
            Err(error) => {
                send(writer, &error.to_string()).await?;
                return Ok(true);
            }
        };

        match command {
            Command::Quit => return Ok(false),
            Command::Sync => return self.run_sync(lines, writer).await,
            Command::Log => return self.run_log(lines, writer).await,
            Command::Desync { names } => {
                for name in names {
                    if let Some(frame) = self.sync.unsubscribe(&name) {
                        send(writer, &frame.to_string()).await?;
                    }
                    send(writer, &format!("{name} desynchronized")).await?;
                }
            }
            Command::List { path } => match self.list_lines(path.as_deref()) {
                Ok(block) => {
                    for line in block {
                        send(writer, &line).await?;
                    }
                }
                Err(error) => send(writer, &error.to_string()).await?,
            },
            other => {
                let reply = match self.apply_mutation(&other, false) {
                    Ok(confirmation) => confirmation,
                    Err(error) => error.to_string(),
                };
                send(writer, &reply).await?;
            }
        }
        Ok(true)
    }

    /// Apply one mutating command (`mkdir`/`rm`/`mv`/`rn`/`cd`).
    ///
    /// On success the home-relative resolved operands are logged, except
    /// in undo mode, where compensations replay without touching the log.
    fn apply_mutation(&mut self, command: &Command, undo_mode: bool) -> Result<String, FsError> {
        match command {
            Command::Mkdir { path } => {
                let logged = self.sandbox.resolve(path)?.join("/");
                self.sandbox.create_dir(path)?;
                if !undo_mode {
                    self.log.record(OpKind::Mkdir, vec![logged]);
                }
                Ok(format!("{path} was created"))
            }
            Command::Remove { path } => {
                let logged = self.sandbox.resolve(path)?.join("/");
                self.sandbox.remove_dir(path)?;
                if !undo_mode {
                    self.log.record(OpKind::Remove, vec![logged]);
                }
                Ok(format!("{path} was removed"))
            }
            Command::Move { src, dst } => {
                let logged_src = self.sandbox.resolve(src)?.join("/");
                let logged_dst = self.sandbox.resolve(dst)?.join("/");
                self.sandbox.move_dir(src, dst)?;
                if !undo_mode {
                    self.log.record(OpKind::Move, vec![logged_src, logged_dst]);
                }
                Ok(format!("{src} was moved to {dst}"))
            }
            Command::Rename { current, target } => {
                let logged_current = self.sandbox.resolve(current)?.join("/");
                let logged_target = self.sandbox.resolve(target)?.join("/");
                self.sandbox.rename_dir(current, target)?;
                if !undo_mode {
                    self.log
                        .record(OpKind::Rename, vec![logged_current, logged_target]);
                }
                Ok(format!("{current} was renamed to {target}"))
            }
            // Navigation is not a mutation of the tree; never logged.
            Command::ChangeDir { path } => {
                self.sandbox.change_dir(path)?;
                Ok(format!("moved to {}{}", self.sandbox.name(), pretty_pwd(&self.sandbox)))
            }
            _ => unreachable!("only mutating commands reach apply_mutation"),
        }
    }

    /// Build the `ls` response block and record the listing for dependency
    /// tracking.
    fn list_lines(&mut self, path: Option<&str>) -> Result<Vec<String>, FsError> {
        let target = path.unwrap_or("");
        // Resolve up front so `..` at home is rejected even for a listing.
        let segments = self.sandbox.resolve(target)?;
        let children = self.sandbox.list(target)?;

        // A bare `ls` is logged without an operand no matter where the PWD
        // sits; only an explicit argument participates in dependency
        // matching.
        match path {
            None => self.log.record(OpKind::List, vec![]),
            Some(_) => {
                let logged = segments.join("/");
                if logged.is_empty() {
                    self.log.record(OpKind::List, vec![]);
                } else {
                    self.log.record(OpKind::List, vec![logged]);
                }
            }
        }

        let name = self.sandbox.display_name(&segments);
        let mut lines = vec![format!("Contents of {} ({} entries)", name, children.len())];
        lines.extend(children);
        Ok(lines)
    }

    /// The `sync` sub-protocol: offer the home's top-level directories,
    /// read one reply line of names, subscribe each.
    async fn run_sync<R, W>(&mut self, lines: &mut Lines<R>, writer: &mut W) -> std::io::Result<bool>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        send(writer, "Available server directories :-").await?;
        match self.sandbox.list_home() {
            Ok(names) => {
                for name in names {
                    send(writer, &name).await?;
                }
            }
            Err(error) => send(writer, &error.to_string()).await?,
        }
        send(writer, "Enter name of directories to sync (separated by space) :").await?;

        let Some(reply) = lines.next_line().await? else {
            return Ok(false);
        };
        let reply = reply.trim();
        if reply.is_empty() {
            send(writer, "Sync Session Over").await?;
            return Ok(true);
        }
        if reply == "quit" {
            return Ok(false);
        }

        for name in reply.split_whitespace() {
            match self.sync.subscribe(name) {
                Ok(frames) => {
                    send(writer, &format!("Synchronizing {name} ...")).await?;
                    for frame in frames {
                        send(writer, &frame.to_string()).await?;
                    }
                    send(writer, &format!("{name} synchronized")).await?;
                }
                Err(FsError::NotFound(_)) => {
                    send(writer, &format!("{name} doesn't exist")).await?;
                }
                Err(error) => send(writer, &error.to_string()).await?,
            }
        }
        Ok(true)
    }

    /// The `log` sub-protocol: print the log, read an index, cascade-delete
    /// it and replay the compensations, then print the refreshed log.
    async fn run_log<R, W>(&mut self, lines: &mut Lines<R>, writer: &mut W) -> std::io::Result<bool>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        for line in self.log.render(&self.name) {
            send(writer, &line).await?;
        }
        send(writer, "Enter index of command to be deleted : (-1 to cancel)").await?;

        let Some(reply) = lines.next_line().await? else {
            return Ok(false);
        };
        let reply = reply.trim();
        if reply == "quit" {
            return Ok(false);
        }
        let Ok(index) = reply.parse::<i64>() else {
            send(writer, "Invalid Format (format : integer index, -1 to cancel)").await?;
            return Ok(true);
        };
        if index == -1 {
            send(writer, "Undo session canceled").await?;
            return Ok(true);
        }
        let Some(compensations) = usize::try_from(index)
            .ok()
            .and_then(|index| self.log.cascade_delete(index))
        else {
            send(writer, &format!("Error : no log entry at index {index}")).await?;
            return Ok(true);
        };

        send(writer, "Undo operation started...").await?;
        self.undo.extend(compensations);
        self.replay_undo();
        send(writer, "Undo operation complete").await?;
        for line in self.log.render(&self.name) {
            send(writer, &line).await?;
        }
        Ok(true)
    }

    /// Drain the undo stack LIFO, replaying each compensation from home.
    ///
    /// Compensations carry home-relative operands, so the PWD is forced to
    /// home for the replay and restored afterwards; replayed commands are
    /// never logged and their responses are discarded.
    fn replay_undo(&mut self) {
        let saved_pwd = self.sandbox.pwd().to_vec();
        self.sandbox.reset_pwd();
        while let Some(line) = self.undo.pop() {
            match Command::parse(&line) {
                Ok(command) => {
                    if let Err(error) = self.apply_mutation(&command, true) {
                        tracing::warn!(user = %self.name, %line, %error, "undo replay failed");
                    }
                }
                Err(error) => {
                    tracing::warn!(user = %self.name, %line, %error, "bad compensation");
                }
            }
        }
        self.sandbox.set_pwd(saved_pwd);
    }
}

fn pretty_pwd(sandbox: &Sandbox) -> String {
    let prefix = sandbox.current_prefix();
    if prefix.is_empty() {
        String::new()
    } else {
        format!("/{}", prefix.trim_end_matches('/'))
    }
}
