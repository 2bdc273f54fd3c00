//! Rewrites raw ansible-playbook output into operator-friendly progress.

use std::io::{self, BufRead, BufReader, Read, Write};

use colored::Colorize;

/// Streaming rewriter for ansible-playbook progress output.
///
/// Consumes the raw byte stream line by line and writes a condensed,
/// colorized rendition to `out`: play banners become section headers,
/// task banners become steps, per-host results become one-glyph status
/// lines. Lines it does not recognize pass through unchanged.
pub struct OutputParser<W: Write> {
    out: W,
    /// Set once the recap block starts; recap lines pass through raw.
    in_recap: bool,
}

impl<W: Write> OutputParser<W> {
    /// Create a parser writing its rewritten stream to `out`.
    pub fn new(out: W) -> Self {
        Self {
            out,
            in_recap: false,
        }
    }

    /// Drain `input` to EOF, rewriting as the stream arrives.
    ///
    /// # Errors
    ///
    /// Returns an error if reading `input` or writing the destination
    /// fails.
    pub fn transform<R: Read>(&mut self, input: R) -> io::Result<()> {
        let reader = BufReader::new(input);
        for line in reader.lines() {
            let line = line?;
            self.rewrite(&line)?;
        }
        self.out.flush()
    }

    fn rewrite(&mut self, line: &str) -> io::Result<()> {
        if line.starts_with("PLAY RECAP") {
            self.in_recap = true;
            writeln!(self.out)?;
            writeln!(self.out, "{}", "─".repeat(70).bright_black())?;
            return writeln!(self.out, "{}", "Play recap".bold());
        }
        if self.in_recap {
            return writeln!(self.out, "{line}");
        }

        if let Some(name) = banner_name(line, "PLAY") {
            writeln!(self.out)?;
            return writeln!(self.out, "{}", name.cyan().bold());
        }
        if let Some(name) = banner_name(line, "TASK") {
            return writeln!(self.out, "{} {name}", "▶".cyan());
        }

        if let Some(host) = result_host(line, "ok:") {
            return writeln!(self.out, "  {} {host}", "✓".green());
        }
        if let Some(host) = result_host(line, "changed:") {
            return writeln!(self.out, "  {} {host}", "✱".yellow());
        }
        if let Some(host) = result_host(line, "skipping:") {
            return writeln!(self.out, "  {} {}", "⋯".bright_black(), host.bright_black());
        }
        if line.starts_with("fatal:") || line.starts_with("failed:") {
            return writeln!(self.out, "  {} {}", "✗".red().bold(), line.red());
        }

        // Raw output inserts blank spacer lines between sections; the
        // rewritten sections bring their own.
        if line.is_empty() {
            return Ok(());
        }
        writeln!(self.out, "{line}")
    }
}

/// Extract the bracketed name from a `PLAY [x] ***` / `TASK [x] ***` banner.
fn banner_name<'a>(line: &'a str, kind: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(kind)?.trim_start().strip_prefix('[')?;
    let end = rest.find(']')?;
    Some(&rest[..end])
}

/// Extract the host from an `ok: [host]`-style result line.
fn result_host<'a>(line: &'a str, prefix: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(prefix)?.trim_start().strip_prefix('[')?;
    let end = rest.find(']')?;
    Some(&rest[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transform_str(input: &str) -> String {
        colored::control::set_override(false);
        let mut buf = Vec::new();
        OutputParser::new(&mut buf).transform(input.as_bytes()).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_play_and_task_banners() {
        let out = transform_str(
            "PLAY [configure etcd] *********\n\
             \n\
             TASK [etcd : install binaries] *********\n",
        );
        assert!(out.contains("configure etcd"));
        assert!(out.contains("▶ etcd : install binaries"));
        // Banner decoration is stripped.
        assert!(!out.contains("***"));
    }

    #[test]
    fn test_host_results() {
        let out = transform_str(
            "ok: [etcd01]\n\
             changed: [master01]\n\
             skipping: [worker01]\n",
        );
        assert!(out.contains("✓ etcd01"));
        assert!(out.contains("✱ master01"));
        assert!(out.contains("⋯ worker01"));
    }

    #[test]
    fn test_failures_stand_out() {
        let out = transform_str("fatal: [etcd01]: UNREACHABLE! => {}\n");
        assert!(out.contains("✗"));
        assert!(out.contains("fatal: [etcd01]"));
    }

    #[test]
    fn test_recap_passes_through() {
        let out = transform_str(
            "PLAY RECAP *********\n\
             etcd01 : ok=12 changed=3 unreachable=0 failed=0\n",
        );
        assert!(out.contains("Play recap"));
        assert!(out.contains("etcd01 : ok=12 changed=3 unreachable=0 failed=0"));
    }

    #[test]
    fn test_unknown_lines_pass_through() {
        let out = transform_str("some diagnostic the parser does not know\n");
        assert!(out.contains("some diagnostic the parser does not know"));
    }
}
