//! The interposition state machine for http(s) remotes.
//!
//! One instance translates a single helper invocation: text-mode menu
//! commands first, then the pkt-line phases of a stateless-connect session.
//! Frames the translator does not modify cross it byte-for-byte; the only
//! deviations are the injections (gittuf `ref-prefix`, gittuf `want`s, the
//! synthesised RSL push refspec) and the suppression of push-report lines for
//! refs the parent Git process never asked to push.

use std::io::{BufRead, Read, Write};

use bstr::ByteSlice;
use gittuf_transport_core::input::CommandReader;
use gittuf_transport_core::pktline;
use gittuf_transport_core::refs::{self, RefRecord, RefTips};
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::helper::SessionOutcome;
use crate::rsl::RslRecorder;

/// The one service with specialized wire-command handling.
const UPLOAD_PACK_SERVICE: &str = "git-upload-pack";

const LS_REFS_KEYWORD: &[u8] = b"command=ls-refs";
const FETCH_KEYWORD: &[u8] = b"command=fetch";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Start,
    ServiceRouter,
    LsRefs,
    LsRefsResponse,
    RequestingWants,
    PackfileIncoming,
    PackfileDone,
}

/// Stateful translator for one helper invocation.
pub struct Translator {
    state: State,
    service: Option<String>,
    is_push: bool,
    push_commands: Vec<Vec<u8>>,
    gittuf_refs: RefTips,
}

impl Default for Translator {
    fn default() -> Self {
        Self::new()
    }
}

impl Translator {
    /// Create a translator in its initial state.
    pub fn new() -> Self {
        Self {
            state: State::Start,
            service: None,
            is_push: false,
            push_commands: Vec::new(),
            gittuf_refs: RefTips::new(),
        }
    }

    /// Drive the conversation until the controller is done or the packfile
    /// phase completes, returning what the session learned about the remote.
    pub fn run<I, O, CI, CO>(
        mut self,
        controller_in: I,
        controller_out: &mut O,
        child_in: &mut CI,
        child_out: &mut CO,
        recorder: &mut dyn RslRecorder,
    ) -> Result<SessionOutcome>
    where
        I: BufRead,
        O: Write,
        CI: Write,
        CO: Read,
    {
        let mut commands = CommandReader::new(controller_in);

        while let Some(token) = commands.next_token()? {
            trace!(state = ?self.state, len = token.len(), "token");
            match self.state {
                State::Start => self.on_menu_command(
                    &token,
                    &mut commands,
                    controller_out,
                    child_in,
                    child_out,
                    recorder,
                )?,
                State::ServiceRouter => self.on_route(&token, child_in)?,
                State::LsRefs => self.on_ls_refs(&token, controller_out, child_in, child_out)?,
                State::RequestingWants => {
                    self.on_wants(&token, &mut commands, controller_out, child_in, child_out)?
                }
                // The response and packfile drains run to completion inside
                // their handlers; the loop never observes these states.
                State::LsRefsResponse | State::PackfileIncoming | State::PackfileDone => break,
            }
            if self.state == State::PackfileDone {
                break;
            }
        }

        Ok(SessionOutcome {
            gittuf_refs: self.gittuf_refs,
            is_push: self.is_push,
        })
    }

    /// Top-level helper menu, text mode.
    fn on_menu_command<I, O, CI, CO>(
        &mut self,
        command: &[u8],
        commands: &mut CommandReader<I>,
        controller_out: &mut O,
        child_in: &mut CI,
        child_out: &mut CO,
        recorder: &mut dyn RslRecorder,
    ) -> Result<()>
    where
        I: BufRead,
        O: Write,
        CI: Write,
        CO: Read,
    {
        if command.starts_with(b"stateless-connect") {
            let service = command
                .trim()
                .fields()
                .nth(1)
                .and_then(|field| field.to_str().ok())
                .map(str::to_owned)
                .ok_or_else(|| Error::protocol("stateless-connect without a service"))?;
            debug!(service = %service, "entering stateless service");
            self.service = Some(service);

            child_in.write_all(command)?;
            child_in.flush()?;

            // The service's initial advertisement.
            relay_until_flush(child_out, controller_out)?;

            commands.enter_packet_mode();
            self.state = State::ServiceRouter;
        } else if command.starts_with(b"list for-push") {
            debug!("listing refs for push");
            child_in.write_all(command)?;
            child_in.flush()?;

            // Mirror the advertisement and harvest gittuf tips along the way:
            // push goes through the legacy list, not v2 ls-refs.
            loop {
                let frame = read_child_frame(child_out)?;
                if let Some(record) = pktline::payload(&frame).and_then(RefRecord::parse) {
                    if refs::is_gittuf_ref(&record.name) {
                        trace!(name = %record.name, tip = %record.target, "discovered gittuf ref");
                        self.gittuf_refs.insert(record.name, record.target);
                    }
                }
                controller_out.write_all(&frame)?;
                if pktline::is_flush(&frame) {
                    controller_out.flush()?;
                    break;
                }
            }
        } else if command.starts_with(b"push") {
            self.on_push_batch(command, commands, controller_out, child_in, child_out, recorder)?;
        } else {
            trace!(command = ?command.as_bstr(), "passing through helper command");
            child_in.write_all(command)?;
            child_in.flush()?;
            relay_until_flush(child_out, controller_out)?;
        }
        Ok(())
    }

    /// A push batch: buffer to the blank-line terminator, record RSL entries,
    /// forward with the RSL refspec appended, then relay the filtered report.
    fn on_push_batch<I, O, CI, CO>(
        &mut self,
        first: &[u8],
        commands: &mut CommandReader<I>,
        controller_out: &mut O,
        child_in: &mut CI,
        child_out: &mut CO,
        recorder: &mut dyn RslRecorder,
    ) -> Result<()>
    where
        I: BufRead,
        O: Write,
        CI: Write,
        CO: Read,
    {
        self.is_push = true;

        let mut command = first.to_vec();
        while command != b"\n" {
            self.push_commands.push(command);
            command = commands
                .next_token()?
                .ok_or_else(|| Error::protocol("push batch ended without a blank line"))?;
        }

        let gittuf_enabled = !self.gittuf_refs.is_empty();
        for push_command in &self.push_commands {
            if gittuf_enabled {
                let (src, dst) = parse_push_refspec(push_command)?;
                if !refs::is_gittuf_ref(&dst) {
                    // The recorder wants the plain ref, not the force marker.
                    let src = src.strip_prefix('+').unwrap_or(&src);
                    if src.is_empty() {
                        debug!(dst_ref = %dst, "deletion refspec, nothing to record");
                    } else {
                        recorder.record(src, &dst)?;
                    }
                }
            }
            child_in.write_all(push_command)?;
        }

        if gittuf_enabled {
            debug!("pushing the RSL alongside user refs");
            let refspec = format!("push {}:{}\n", refs::RSL_REF, refs::RSL_REF);
            child_in.write_all(refspec.as_bytes())?;
        }
        child_in.write_all(b"\n")?;
        child_in.flush()?;
        self.push_commands.clear();

        // Relay the push report, dropping lines about refs this helper pushed
        // on its own: Git was never told about them and would trip over a
        // status for an unknown ref.
        loop {
            let frame = read_child_frame(child_out)?;
            let suppress = pktline::payload(&frame)
                .is_some_and(|payload| payload.contains_str(refs::GITTUF_REF_PREFIX));
            if suppress {
                trace!("suppressing gittuf ref status");
            } else {
                controller_out.write_all(&frame)?;
            }
            if pktline::is_flush(&frame) {
                controller_out.flush()?;
                return Ok(());
            }
        }
    }

    /// Per-packet dispatch inside a stateless-connect session.
    fn on_route<CI: Write>(&mut self, token: &[u8], child_in: &mut CI) -> Result<()> {
        if self.service.as_deref() == Some(UPLOAD_PACK_SERVICE) {
            if let Some(payload) = pktline::payload(token) {
                if payload.contains_str(LS_REFS_KEYWORD) {
                    debug!("ls-refs requested");
                    self.state = State::LsRefs;
                } else if payload.contains_str(FETCH_KEYWORD) {
                    debug!("fetch requested");
                    self.state = State::RequestingWants;
                }
            }
        }
        // Routing only; the child's response is read in the next state.
        child_in.write_all(token)?;
        child_in.flush()?;
        Ok(())
    }

    /// ls-refs arguments: inject the gittuf ref-prefix right before the
    /// terminating flush, then drain the advertisement.
    fn on_ls_refs<O, CI, CO>(
        &mut self,
        token: &[u8],
        controller_out: &mut O,
        child_in: &mut CI,
        child_out: &mut CO,
    ) -> Result<()>
    where
        O: Write,
        CI: Write,
        CO: Read,
    {
        if pktline::is_flush(token) {
            debug!("advertising interest in gittuf refs");
            let inject = pktline::encode(format!("ref-prefix {}\n", refs::GITTUF_REF_PREFIX).as_bytes())?;
            child_in.write_all(&inject)?;
            self.state = State::LsRefsResponse;
        }
        child_in.write_all(token)?;

        if self.state == State::LsRefsResponse {
            child_in.flush()?;
            self.drain_ls_refs_response(controller_out, child_out)?;
            self.state = State::ServiceRouter;
        }
        Ok(())
    }

    fn drain_ls_refs_response<O, CO>(&mut self, controller_out: &mut O, child_out: &mut CO) -> Result<()>
    where
        O: Write,
        CO: Read,
    {
        loop {
            let frame = read_child_frame(child_out)?;
            if let Some(record) = pktline::payload(&frame).and_then(RefRecord::parse) {
                if refs::is_gittuf_ref(&record.name) {
                    trace!(name = %record.name, tip = %record.target, "discovered gittuf ref");
                    self.gittuf_refs.insert(record.name, record.target);
                }
            }
            controller_out.write_all(&frame)?;
            if pktline::is_response_end(&frame) {
                controller_out.flush()?;
                return Ok(());
            }
        }
    }

    /// Wants list of a fetch: inject one want per gittuf tip right before the
    /// terminating flush, then stream the packfile response.
    fn on_wants<I, O, CI, CO>(
        &mut self,
        token: &[u8],
        commands: &mut CommandReader<I>,
        controller_out: &mut O,
        child_in: &mut CI,
        child_out: &mut CO,
    ) -> Result<()>
    where
        I: BufRead,
        O: Write,
        CI: Write,
        CO: Read,
    {
        if pktline::is_flush(token) {
            // Gittuf wants ride along exactly once per wants batch.
            for (name, tip) in &self.gittuf_refs {
                trace!(name = %name, tip = %tip, "adding gittuf want");
                child_in.write_all(&pktline::encode(format!("want {tip}\n").as_bytes())?)?;
            }
            child_in.write_all(token)?;
            child_in.flush()?;
            self.state = State::PackfileIncoming;
            self.stream_packfile(commands, controller_out, child_out)?;
        } else {
            child_in.write_all(token)?;
        }
        Ok(())
    }

    /// Forward packfile frames verbatim. A response-end either finishes the
    /// session or, if the controller follows up with more wants, loops the
    /// machine back with the follow-up token left unconsumed.
    fn stream_packfile<I, O, CO>(
        &mut self,
        commands: &mut CommandReader<I>,
        controller_out: &mut O,
        child_out: &mut CO,
    ) -> Result<()>
    where
        I: BufRead,
        O: Write,
        CO: Read,
    {
        debug!("awaiting packfile");
        loop {
            let frame = read_child_frame(child_out)?;
            controller_out.write_all(&frame)?;
            if pktline::is_response_end(&frame) {
                controller_out.flush()?;
                match commands.next_token()? {
                    None => self.state = State::PackfileDone,
                    Some(token) if token.is_empty() => self.state = State::PackfileDone,
                    Some(token) => {
                        debug!("negotiation continues with another wants batch");
                        commands.unread(token);
                        self.state = State::RequestingWants;
                    }
                }
                return Ok(());
            }
        }
    }
}

/// Read one frame from the child, treating EOF mid-response as a protocol
/// violation.
fn read_child_frame<CO: Read>(child_out: &mut CO) -> Result<Vec<u8>> {
    match pktline::read_frame(child_out)? {
        Some(frame) => Ok(frame),
        None => Err(Error::protocol("backing helper closed the stream mid-response")),
    }
}

/// Forward child frames to the controller up to and including the flush.
fn relay_until_flush<CO: Read, O: Write>(child_out: &mut CO, controller_out: &mut O) -> Result<()> {
    loop {
        let frame = read_child_frame(child_out)?;
        controller_out.write_all(&frame)?;
        if pktline::is_flush(&frame) {
            controller_out.flush()?;
            return Ok(());
        }
    }
}

/// Split `push <src>:<dst>` into its refspec halves.
fn parse_push_refspec(command: &[u8]) -> Result<(String, String)> {
    let spec = command
        .trim()
        .strip_prefix(b"push")
        .map(|rest| rest.trim())
        .ok_or_else(|| Error::protocol(format!("not a push command: {:?}", command.as_bstr())))?;
    let (src, dst) = spec
        .split_once_str(":")
        .ok_or_else(|| Error::protocol(format!("malformed push refspec: {:?}", spec.as_bstr())))?;
    let src = src
        .to_str()
        .map_err(|_| Error::protocol("push refspec is not valid UTF-8"))?;
    let dst = dst
        .to_str()
        .map_err(|_| Error::protocol("push refspec is not valid UTF-8"))?;
    Ok((src.to_owned(), dst.to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refspec_splits_on_the_colon() {
        let (src, dst) = parse_push_refspec(b"push refs/heads/main:refs/heads/main\n").unwrap();
        assert_eq!(src, "refs/heads/main");
        assert_eq!(dst, "refs/heads/main");
    }

    #[test]
    fn refspec_keeps_force_marker_on_source() {
        let (src, dst) = parse_push_refspec(b"push +refs/heads/dev:refs/heads/dev\n").unwrap();
        assert_eq!(src, "+refs/heads/dev");
        assert_eq!(dst, "refs/heads/dev");
    }

    #[test]
    fn refspec_with_empty_source_is_a_deletion() {
        let (src, dst) = parse_push_refspec(b"push :refs/heads/gone\n").unwrap();
        assert_eq!(src, "");
        assert_eq!(dst, "refs/heads/gone");
    }

    #[test]
    fn refspec_without_colon_is_rejected() {
        assert!(matches!(
            parse_push_refspec(b"push refs/heads/main\n"),
            Err(Error::Protocol(_))
        ));
    }
}
