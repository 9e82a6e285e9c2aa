//! Transport that shells out to `curl` and reads the status from its `-v` trace.
//!
//! Each request is one `curl` process. Its response body (stdout) and its
//! protocol trace (stderr) are drained by two reader threads running alongside
//! the child, so a child that fills one pipe while the other is being read can
//! never stall the exchange.

use std::env;
use std::io::{self, Read};
use std::process::{Command, Stdio};
use std::thread::{self, JoinHandle};

use anyhow::{Context, Result, anyhow};

use crate::status::final_status;
use crate::{Credentials, DavMethod, DavRequest, DavResponse, Transport, XML_CONTENT_TYPE};

#[derive(Debug, Clone)]
pub struct CurlTransport {
    program: String,
}

impl Default for CurlTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl CurlTransport {
    /// `curl` from `PATH`, or the program named by `DAVPUB_CURL_BIN`.
    pub fn new() -> Self {
        Self::with_program(curl_program())
    }

    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl Transport for CurlTransport {
    fn execute(&self, credentials: &Credentials, request: &DavRequest) -> Result<DavResponse> {
        let args = command_args(credentials, request);
        let trace = run_capturing(&self.program, &args).with_context(|| {
            format!(
                "failed to run {}; is curl installed?",
                render_command(&self.program, &args)
            )
        })?;
        Ok(final_status(&trace))
    }

    fn name(&self) -> &'static str {
        "curl"
    }
}

fn curl_program() -> String {
    env::var("DAVPUB_CURL_BIN").unwrap_or_else(|_| "curl".to_string())
}

/// Arguments passed to `curl` for `request` (the program name excluded).
pub fn command_args(credentials: &Credentials, request: &DavRequest) -> Vec<String> {
    let mut args: Vec<String> = vec![
        "-v".into(),
        "-s".into(),
        "--http1.1".into(),
        "--globoff".into(),
        "-u".into(),
        format!("{}:{}", credentials.username(), credentials.password()),
    ];

    match request.method {
        DavMethod::Head => args.push("-I".into()),
        DavMethod::Put => {
            if let Some(body) = &request.body {
                args.push("--upload-file".into());
                args.push(body.display().to_string());
            }
        }
        method => {
            args.push("--request".into());
            args.push(method.as_str().into());
        }
    }

    if request.sends_xml_content_type() {
        args.push("--header".into());
        args.push(format!("Content-Type: {XML_CONTENT_TYPE}"));
    }
    if let Some(destination) = &request.destination {
        args.push("--header".into());
        args.push(format!("Destination: {destination}"));
    }
    if let Some(depth) = request.depth {
        args.push("--header".into());
        args.push(format!("Depth: {}", depth.header_value()));
    }

    args.push(request.url.clone());
    args
}

/// Command line for logs and error messages, with the password masked.
pub fn render_command(program: &str, args: &[String]) -> String {
    let mut rendered = vec![program.to_string()];
    let mut mask_next = false;
    for arg in args {
        if mask_next {
            let user = arg.split_once(':').map(|(u, _)| u).unwrap_or(arg);
            rendered.push(format!("{user}:****"));
            mask_next = false;
        } else {
            mask_next = arg == "-u";
            rendered.push(arg.clone());
        }
    }
    rendered.join(" ")
}

/// Runs `program` to completion and returns its stderr; stdout is drained and dropped.
pub(crate) fn run_capturing(program: &str, args: &[String]) -> Result<String> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .context("failed to spawn command")?;

    let mut stdout = child.stdout.take().context("child stdout was not captured")?;
    let stderr = child.stderr.take().context("child stderr was not captured")?;

    let body_reader = thread::spawn(move || io::copy(&mut stdout, &mut io::sink()));
    let trace_reader = thread::spawn(move || drain(stderr));

    child.wait().context("failed to wait for command")?;
    join_reader(body_reader, "stdout")?;
    let trace = join_reader(trace_reader, "stderr")?;

    Ok(String::from_utf8_lossy(&trace).into_owned())
}

fn drain<R: Read>(mut stream: R) -> io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    stream.read_to_end(&mut buf)?;
    Ok(buf)
}

fn join_reader<T>(handle: JoinHandle<io::Result<T>>, stream: &str) -> Result<T> {
    handle
        .join()
        .map_err(|_| anyhow!("{stream} reader thread panicked"))?
        .with_context(|| format!("failed to read child {stream}"))
}
