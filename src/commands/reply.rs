//! Command Replies
//!
//! Every command produces a [`Reply`]. The session loop decides where each
//! piece goes: [`Reply::Text`] to standard output, [`Reply::Error`] to
//! standard error.

use std::fmt;

/// Output channel for one rendered line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Stdout,
    Stderr,
}

/// The result of executing one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Nothing to print (blank input line)
    Empty,

    /// Normal output
    Text(String),

    /// Usage, parse or store failures
    Error(String),

    /// Several replies, in order
    Batch(Vec<Reply>),

    /// Farewell message; the session terminates after printing it
    Exit(String),
}

impl Reply {
    pub fn text(s: impl Into<String>) -> Self {
        Reply::Text(s.into())
    }

    pub fn error(s: impl Into<String>) -> Self {
        Reply::Error(s.into())
    }

    pub fn batch(replies: Vec<Reply>) -> Self {
        Reply::Batch(replies)
    }

    /// Returns true if this reply ends the session.
    pub fn is_exit(&self) -> bool {
        match self {
            Reply::Exit(_) => true,
            Reply::Batch(replies) => replies.iter().any(Reply::is_exit),
            _ => false,
        }
    }

    /// Returns true if any part of this reply is an error.
    pub fn has_error(&self) -> bool {
        match self {
            Reply::Error(_) => true,
            Reply::Batch(replies) => replies.iter().any(Reply::has_error),
            _ => false,
        }
    }

    /// Flattens the reply into `(channel, line)` pairs in output order.
    pub fn lines(&self) -> Vec<(Channel, &str)> {
        let mut out = Vec::new();
        self.collect_lines(&mut out);
        out
    }

    fn collect_lines<'a>(&'a self, out: &mut Vec<(Channel, &'a str)>) {
        match self {
            Reply::Empty => {}
            Reply::Text(s) | Reply::Exit(s) => out.push((Channel::Stdout, s.as_str())),
            Reply::Error(s) => out.push((Channel::Stderr, s.as_str())),
            Reply::Batch(replies) => {
                for reply in replies {
                    reply.collect_lines(out);
                }
            }
        }
    }
}

impl fmt::Display for Reply {
    /// Renders every line, regardless of channel, newline-terminated.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (_, line) in self.lines() {
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines_preserve_order_and_channel() {
        let reply = Reply::batch(vec![
            Reply::text("one"),
            Reply::Empty,
            Reply::batch(vec![Reply::error("two"), Reply::text("three")]),
        ]);

        assert_eq!(
            reply.lines(),
            vec![
                (Channel::Stdout, "one"),
                (Channel::Stderr, "two"),
                (Channel::Stdout, "three"),
            ]
        );
        assert!(reply.has_error());
        assert!(!reply.is_exit());
    }

    #[test]
    fn test_exit_detection() {
        assert!(Reply::Exit("bye".into()).is_exit());
        assert!(Reply::batch(vec![Reply::Exit("bye".into())]).is_exit());
        assert!(!Reply::Empty.is_exit());
    }

    #[test]
    fn test_display() {
        let reply = Reply::batch(vec![Reply::text("a"), Reply::error("b")]);
        assert_eq!(reply.to_string(), "a\nb\n");
    }
}
