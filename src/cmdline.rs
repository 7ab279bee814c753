//! Windows command-line quoting.
//!
//! Follows the rules `CommandLineToArgvW` uses to split a command line, so
//! that [`escape_arg`] and [`split_command`] round-trip.

/// Quotes `arg` so that it is read back as a single argument.
pub fn escape_arg(arg: &str) -> String {
    if arg.is_empty() {
        return "\"\"".to_string();
    }
    if !arg.contains([' ', '\t', '"']) {
        return arg.to_string();
    }

    let mut out = String::with_capacity(arg.len() + 2);
    out.push('"');
    let mut backslashes = 0;
    for c in arg.chars() {
        match c {
            '\\' => backslashes += 1,
            '"' => {
                out.extend(std::iter::repeat('\\').take(backslashes * 2 + 1));
                out.push('"');
                backslashes = 0;
            }
            _ => {
                out.extend(std::iter::repeat('\\').take(backslashes));
                out.push(c);
                backslashes = 0;
            }
        }
    }
    out.extend(std::iter::repeat('\\').take(backslashes * 2));
    out.push('"');
    out
}

/// Joins arguments into a single command-line string.
pub fn join_args<I, S>(args: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    args.into_iter()
        .map(|a| escape_arg(a.as_ref()))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Splits a command line into its program and arguments.
///
/// The program name is taken verbatim up to the closing quote or the first
/// whitespace; backslashes in it are never escapes. Returns `None` for an
/// empty command line.
pub fn split_command(line: &str) -> Option<(String, Vec<String>)> {
    let line = line.trim_start();
    if line.is_empty() {
        return None;
    }

    let (program, rest) = if let Some(quoted) = line.strip_prefix('"') {
        match quoted.find('"') {
            Some(end) => (&quoted[..end], &quoted[end + 1..]),
            None => (quoted, ""),
        }
    } else {
        match line.find([' ', '\t']) {
            Some(end) => (&line[..end], &line[end..]),
            None => (line, ""),
        }
    };

    if program.is_empty() {
        return None;
    }
    Some((program.to_string(), split_args(rest)))
}

fn split_args(line: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut chars = line.chars().peekable();

    loop {
        while matches!(chars.peek(), Some(' ') | Some('\t')) {
            chars.next();
        }
        if chars.peek().is_none() {
            return args;
        }

        let mut arg = String::new();
        let mut in_quotes = false;
        let mut backslashes = 0usize;
        while let Some(&c) = chars.peek() {
            match c {
                '\\' => {
                    backslashes += 1;
                    chars.next();
                }
                '"' => {
                    arg.extend(std::iter::repeat('\\').take(backslashes / 2));
                    chars.next();
                    if backslashes % 2 == 1 {
                        arg.push('"');
                    } else if in_quotes && chars.peek() == Some(&'"') {
                        // "" inside quotes is a literal quote
                        arg.push('"');
                        chars.next();
                    } else {
                        in_quotes = !in_quotes;
                    }
                    backslashes = 0;
                }
                ' ' | '\t' if !in_quotes => break,
                _ => {
                    arg.extend(std::iter::repeat('\\').take(backslashes));
                    backslashes = 0;
                    arg.push(c);
                    chars.next();
                }
            }
        }
        arg.extend(std::iter::repeat('\\').take(backslashes));
        args.push(arg);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_arguments_are_untouched() {
        assert_eq!(escape_arg("update"), "update");
        assert_eq!(escape_arg("192.168.1.*"), "192.168.1.*");
        assert_eq!(escape_arg(r"C:\Tools\wgtoggle.exe"), r"C:\Tools\wgtoggle.exe");
    }

    #[test]
    fn arguments_with_spaces_or_quotes_are_quoted() {
        assert_eq!(escape_arg(""), "\"\"");
        assert_eq!(escape_arg("Main Office"), "\"Main Office\"");
        assert_eq!(escape_arg("say \"hi\""), r#""say \"hi\"""#);
        assert_eq!(
            escape_arg(r"C:\Program Files\SCJ\"),
            r#""C:\Program Files\SCJ\\""#
        );
    }

    #[test]
    fn join_quotes_each_argument() {
        let line = join_args(["update", "-t", "Main Office", "-g", "192.168.1.*"]);
        assert_eq!(line, "update -t \"Main Office\" -g 192.168.1.*");
    }

    #[test]
    fn split_quoted_program() {
        let (program, args) =
            split_command(r#""C:\Program Files\SCJ\wgtoggle\1.0.0\wgtoggle.exe" uninstall"#)
                .unwrap();
        assert_eq!(program, r"C:\Program Files\SCJ\wgtoggle\1.0.0\wgtoggle.exe");
        assert_eq!(args, vec!["uninstall"]);
    }

    #[test]
    fn split_unquoted_program() {
        let (program, args) = split_command(r"C:\Tools\wgtoggle.exe uninstall  --quiet").unwrap();
        assert_eq!(program, r"C:\Tools\wgtoggle.exe");
        assert_eq!(args, vec!["uninstall", "--quiet"]);
    }

    #[test]
    fn split_empty_is_none() {
        assert!(split_command("").is_none());
        assert!(split_command("   ").is_none());
        assert!(split_command("\"\" uninstall").is_none());
    }

    #[test]
    fn escaped_arguments_split_back() {
        let original = vec![
            "-t".to_string(),
            "Main Office".to_string(),
            "say \"hi\"".to_string(),
            r"C:\Program Files\SCJ\".to_string(),
            String::new(),
        ];
        let line = format!("wgtoggle.exe {}", join_args(&original));
        let (program, args) = split_command(&line).unwrap();
        assert_eq!(program, "wgtoggle.exe");
        assert_eq!(args, original);
    }
}
