//! Timeline command parsing
//!
//! One command per line, `command [arg]`. Lines that do not parse are
//! dropped by the caller without aborting the script.

/// A parsed timeline command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// `# ...` - no-op
    Comment,
    /// `setattr <id> <field> <expr>`
    SetAttr {
        target: String,
        field: String,
        expr: String,
    },
    /// `call <id> <method> [args...]` - each arg is an expression
    Call {
        target: String,
        method: String,
        args: Vec<String>,
    },
    /// `dialog <portraitID> <text>`
    Dialog { portrait: String, text: String },
    /// `play_music <name>`
    PlayMusic { name: String },
    /// `timeline <name>` - swap the active program
    SwitchTimeline { name: String },
    /// `skip_to <n>`
    SkipTo { step: f32 },
    /// `exec <ident> = <expr>` - assign a script variable
    Exec { name: String, expr: String },
    /// `if <expr>`
    If { expr: String },
    /// `if_watched <name>` - empty name means the active program
    IfWatched { name: String },
    /// `if_not_watched <name>`
    IfNotWatched { name: String },
    /// `while <expr>`
    While { expr: String },
}

/// Parse one command line. `None` means malformed or unknown; the
/// interpreter ignores such lines.
pub fn parse_line(line: &str) -> Option<Command> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    if line.starts_with('#') {
        return Some(Command::Comment);
    }

    let (word, arg) = match line.split_once(char::is_whitespace) {
        Some((w, rest)) => (w, rest.trim()),
        None => (line, ""),
    };

    match word {
        "setattr" => {
            let mut parts = arg.splitn(3, char::is_whitespace);
            let target = parts.next()?.to_string();
            let field = parts.next()?.to_string();
            let expr = parts.next()?.trim().to_string();
            if expr.is_empty() {
                return None;
            }
            Some(Command::SetAttr {
                target,
                field,
                expr,
            })
        }
        "call" => {
            let mut parts = arg.split_whitespace();
            let target = parts.next()?.to_string();
            let method = parts.next()?.to_string();
            let args = parts.map(str::to_string).collect();
            Some(Command::Call {
                target,
                method,
                args,
            })
        }
        "dialog" => {
            let (portrait, text) = arg.split_once(char::is_whitespace)?;
            Some(Command::Dialog {
                portrait: portrait.to_string(),
                text: text.trim().to_string(),
            })
        }
        "play_music" if !arg.is_empty() => Some(Command::PlayMusic {
            name: arg.to_string(),
        }),
        "timeline" if !arg.is_empty() => Some(Command::SwitchTimeline {
            name: arg.to_string(),
        }),
        "skip_to" => arg
            .parse::<f32>()
            .ok()
            .map(|step| Command::SkipTo { step }),
        "exec" => {
            let (name, expr) = arg.split_once('=')?;
            let name = name.trim();
            let expr = expr.trim();
            // Reject '==' and similar; the target must be a bare identifier
            if name.is_empty()
                || expr.starts_with('=')
                || !name.chars().all(|c| c.is_alphanumeric() || c == '_')
            {
                return None;
            }
            Some(Command::Exec {
                name: name.to_string(),
                expr: expr.to_string(),
            })
        }
        "if" if !arg.is_empty() => Some(Command::If {
            expr: arg.to_string(),
        }),
        "if_watched" => Some(Command::IfWatched {
            name: arg.to_string(),
        }),
        "if_not_watched" => Some(Command::IfNotWatched {
            name: arg.to_string(),
        }),
        "while" if !arg.is_empty() => Some(Command::While {
            expr: arg.to_string(),
        }),
        _ => None,
    }
}
