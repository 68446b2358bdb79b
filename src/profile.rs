//! Read-only inspection of OpenVPN profiles.
//!
//! The engine owns the real parsing. This scanner only pulls out a few
//! directives worth logging before the profile is applied.

/// One `remote` directive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    pub host: String,
    pub port: Option<u16>,
    pub proto: Option<String>,
}

/// Summary of the directives found in a profile
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileSummary {
    pub remotes: Vec<RemoteEntry>,
    pub proto: Option<String>,
    pub dev: Option<String>,
    pub auth_user_pass: bool,
    pub inline_blocks: Vec<String>,
}

impl ProfileSummary {
    /// Scan profile bytes; non-UTF-8 input yields an empty summary
    pub fn inspect(profile: &[u8]) -> Self {
        let mut summary = Self::default();
        let Ok(text) = std::str::from_utf8(profile) else {
            return summary;
        };

        let mut in_block: Option<String> = None;

        for raw in text.lines() {
            let line = raw.trim();

            if let Some(tag) = &in_block {
                if line.strip_prefix("</").and_then(|l| l.strip_suffix('>')) == Some(tag.as_str()) {
                    in_block = None;
                }
                continue;
            }

            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }

            if let Some(tag) = line.strip_prefix('<').and_then(|l| l.strip_suffix('>')) {
                if !tag.starts_with('/') {
                    summary.inline_blocks.push(tag.to_string());
                    in_block = Some(tag.to_string());
                }
                continue;
            }

            let parts: Vec<&str> = line.split_whitespace().collect();
            let args = &parts[1..];
            match parts[0] {
                "remote" => {
                    if let Some(host) = args.first() {
                        summary.remotes.push(RemoteEntry {
                            host: host.to_string(),
                            port: args.get(1).and_then(|p| p.parse().ok()),
                            proto: args.get(2).map(|p| p.to_string()),
                        });
                    }
                }
                "proto" => summary.proto = args.first().map(|p| p.to_string()),
                "dev" => summary.dev = args.first().map(|d| d.to_string()),
                "auth-user-pass" => summary.auth_user_pass = true,
                _ => {}
            }
        }

        summary
    }

    /// First remote as `host:port`, for log lines
    pub fn primary_remote(&self) -> Option<String> {
        self.remotes.first().map(|r| match r.port {
            Some(port) => format!("{}:{port}", r.host),
            None => r.host.clone(),
        })
    }
}
