use std::io::{self, Write};
use std::process::{Command, Stdio};
use std::sync::Arc;

use crate::context::Context;
use crate::error::{Error, Failure, Result};
use crate::processor::Processor;

/// Pipes content through an external HTML formatter, `tidy` by default.
///
/// Diagnostics the program writes to stderr are logged: as warnings for
/// exit codes `0` and `1` (warnings only), as errors otherwise. The
/// program's output replaces the content either way.
#[derive(Debug, Clone)]
pub struct Tidy {
    command: Arc<str>,
    options: Vec<String>,
}

impl Tidy {
    pub fn new<C: Into<Arc<str>>>(command: C, options: Vec<String>) -> Self {
        Tidy { command: command.into(), options }
    }
}

impl Default for Tidy {
    fn default() -> Self {
        Tidy::new("tidy", vec!["-quiet".into(), "-raw".into()])
    }
}

impl Processor for Tidy {
    fn process(&self, context: &mut Context<'_>) -> Result<()> {
        let dest = context.node(context.dest_node()).map(|n| n.alcn_arc());
        let child = Command::new(&*self.command)
            .args(&self.options)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn();

        let mut child = match child {
            Ok(child) => child,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(Failure::CommandNotFound {
                    command: self.command.clone(),
                    processor: "tidy".into(),
                    dest,
                }.into());
            }
            Err(e) => return Err(Error::from(e).chain(error!("failed to run tidy", "command" => self.command))),
        };

        let mut stdin = child.stdin.take();
        let input = context.content.as_bytes();
        let (written, output) = std::thread::scope(|s| {
            let writer = s.spawn(move || match stdin.as_mut() {
                Some(stdin) => stdin.write_all(input),
                None => Ok(()),
            });

            let output = child.wait_with_output();
            (writer.join(), output)
        });

        let output = output?;
        let warnings_only = matches!(output.status.code(), Some(0 | 1));
        for line in String::from_utf8_lossy(&output.stderr).lines().filter(|l| !l.trim().is_empty()) {
            match warnings_only {
                true => tracing::warn!(processor = "tidy", dest = dest.as_deref(), "{line}"),
                false => tracing::error!(processor = "tidy", dest = dest.as_deref(), "{line}"),
            }
        }

        if !warnings_only {
            tracing::error!(processor = "tidy", dest = dest.as_deref(), "{} exited with {}", self.command, output.status);
        }

        match written {
            Ok(Err(e)) if e.kind() != io::ErrorKind::BrokenPipe => return Err(e.into()),
            Err(_) => return err!("tidy input writer panicked"),
            _ => {}
        }

        context.content = String::from_utf8(output.stdout)
            .map_err(|e| error!("tidy produced invalid UTF-8", e))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::Processors;
    use crate::tree::Tree;

    fn run(tidy: &Tidy, content: &str) -> Result<String> {
        let tree = Tree::new();
        let processors = Processors::new();
        let mut context = Context::new(&tree, &processors, vec![]).with_content(content);
        tidy.process(&mut context)?;
        Ok(context.content)
    }

    #[test]
    fn missing_command() {
        let tidy = Tidy::new("kestrel-no-such-command", vec![]);
        let error = run(&tidy, "<p>").unwrap_err();
        assert!(matches!(error.failure(), Some(Failure::CommandNotFound { command, processor, .. })
            if &**command == "kestrel-no-such-command" && &**processor == "tidy"));
    }

    #[cfg(unix)]
    #[test]
    fn pipes_content() {
        let cat = Tidy::new("sh", vec!["-c".into(), "echo 'line 1: warning' >&2; cat".into()]);
        assert_eq!(run(&cat, "<p>hi</p>").unwrap(), "<p>hi</p>");

        let fails = Tidy::new("sh", vec!["-c".into(), "cat >/dev/null; echo 'line 1: error' >&2; printf partial; exit 2".into()]);
        assert_eq!(run(&fails, "<p>").unwrap(), "partial");
    }
}
