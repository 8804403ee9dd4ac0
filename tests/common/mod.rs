//! Shared host-file fixtures for integration tests.
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Oldest layout: top-level version tag and nested outbound selection.
pub const LEGACY_HOST: &str = r##"/** @ParserConfig
{
  "version": 1,
  "ParserConfig": {
    "proxies": [
      { "source": "https://example.com/sub", "skip": [ { "tag": "^RU" } ] },
      { "source": "vless://uuid@host:443#inline" }
    ],
    "outbounds": [
      {
        "tag": "proxy-out",
        "type": "selector",
        "options": { "interrupt_exist_connections": true, "default": "auto-proxy-out" },
        "outbounds": {
          "proxies": { "tag": "!/(RU)/i" },
          "addOutbounds": ["direct-out", "auto-proxy-out"],
          "preferredDefault": { "tag": "/NL/i" }
        },
        "comment": "main selector"
      },
      { "tag": "auto-proxy-out", "type": "urltest", "filters": { "tag": "/NL|DE/i" } }
    ]
  }
}
*/
{
  // sing-box tolerates comments in its config
  "log": { "level": "warn", "timestamp": true },
  "outbounds": [ { "type": "direct", "tag": "direct-out" } ]
}
"##;

pub const UNVERSIONED_HOST: &str = "{\n  \"log\": {}\n}\n/** @ParserConfig\n{\"ParserConfig\":{\"proxies\":[],\"outbounds\":[]}}\n*/\n// tail\n";

pub const NEWER_HOST: &str =
    "/** @ParserConfig\n{\"ParserConfig\":{\"version\":99,\"proxies\":[],\"outbounds\":[]}}\n*/\n{}\n";

pub const NO_BLOCK_HOST: &str = "{\n  /* regular comment */\n  \"outbounds\": []\n}\n";

/// Latin-1 bytes on both sides of the block.
pub const LATIN1_HOST: &[u8] =
    b"// caf\xE9 latin-1 comment\n/** @ParserConfig\n{\"ParserConfig\":{\"version\":3,\"proxies\":[],\"outbounds\":[]}}\n*/\n{ \"note\": \"na\xEFve\" }\n";

pub const MALFORMED_HOST: &str = "/** @ParserConfig\n{\"ParserConfig\": {\"proxies\": [}\n*/\n{}\n";

/// Temp dir holding a single `config.json` with `contents`.
pub struct HostFile {
    _dir: TempDir,
    path: PathBuf,
}

impl HostFile {
    pub fn new(contents: impl AsRef<[u8]>) -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("config.json");
        std::fs::write(&path, contents).expect("write host file");
        Self { _dir: dir, path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn read(&self) -> String {
        std::fs::read_to_string(&self.path).expect("read host file")
    }

    pub fn read_bytes(&self) -> Vec<u8> {
        std::fs::read(&self.path).expect("read host file")
    }

    pub fn dir_entries(&self) -> usize {
        let parent = self.path.parent().expect("host has parent");
        std::fs::read_dir(parent).expect("list temp dir").count()
    }
}
