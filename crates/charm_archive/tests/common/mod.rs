#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use zip::write::SimpleFileOptions;

pub const DUMMY_METADATA: &str = r#"name: dummy
summary: "That's a dummy charm."
description: |
    This is a longer description which
    potentially contains multiple lines.
provides:
  website: http
"#;

pub const DUMMY_CONFIG: &str = r#"options:
  title:
    default: My Title
    description: A descriptive title used for the service.
    type: string
  outlook:
    description: No default outlook.
    type: string
"#;

pub const DUMMY_ACTIONS: &str = r#"snapshot:
  description: Take a snapshot of the database.
  params:
    outfile:
      description: The file to write out to.
      type: string
      default: foo.bz2
"#;

/// The manifest of the dummy charm created by [`dummy_dir`].
pub const DUMMY_MANIFEST: [&str; 9] = [
    "actions.yaml",
    "config.yaml",
    "empty",
    "empty/.gitkeep",
    "hooks",
    "hooks/install",
    "metadata.yaml",
    "src",
    "src/hello.c",
];

/// Creates the dummy charm below `root` and returns its path.
pub fn dummy_dir(root: &Path) -> PathBuf {
    let dir = root.join("dummy");
    write_file(&dir, "metadata.yaml", DUMMY_METADATA, 0o644);
    write_file(&dir, "config.yaml", DUMMY_CONFIG, 0o644);
    write_file(&dir, "actions.yaml", DUMMY_ACTIONS, 0o644);
    write_file(&dir, "revision", "1", 0o644);
    write_file(&dir, "hooks/install", "#!/bin/bash\necho $0\n", 0o755);
    write_file(&dir, "src/hello.c", "int main() {\n\treturn 0;\n}\n", 0o644);
    write_file(&dir, "empty/.gitkeep", "", 0o644);
    dir
}

/// Writes `content` to `name` below `dir`, creating parent directories as needed.
pub fn write_file(dir: &Path, name: &str, content: &str, mode: u32) {
    let path = dir.join(name);
    fs_err::create_dir_all(path.parent().unwrap()).unwrap();
    fs_err::write(&path, content).unwrap();
    set_mode(&path, mode);
}

pub fn set_mode(path: &Path, mode: u32) {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs_err::set_permissions(path, std::fs::Permissions::from_mode(mode)).unwrap();
    }
    #[cfg(not(unix))]
    let _ = (path, mode);
}

#[cfg(unix)]
pub fn mode_of(path: &Path) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    fs_err::symlink_metadata(path).unwrap().permissions().mode() & 0o7777
}

/// A member of a hand crafted container.
pub enum Member<'a> {
    File(&'a str, &'a str, u32),
    Dir(&'a str),
    Symlink(&'a str, &'a str),
}

/// Builds a zip container directly, bypassing all checks of the package writer.
pub fn craft_archive(members: &[Member<'_>]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    for member in members {
        match member {
            Member::File(name, content, mode) => {
                writer
                    .start_file(*name, options.unix_permissions(*mode))
                    .unwrap();
                writer.write_all(content.as_bytes()).unwrap();
            }
            Member::Dir(name) => writer.add_directory(*name, options).unwrap(),
            Member::Symlink(name, target) => writer.add_symlink(*name, *target, options).unwrap(),
        }
    }
    writer.finish().unwrap().into_inner()
}

/// Overwrites the unix mode stored in the central directory for the member `name`.
///
/// The `zip` writer masks permissions to `0o777`, so this is the only way to craft members that
/// carry setuid, setgid or sticky bits.
pub fn with_unix_mode(mut bytes: Vec<u8>, name: &str, mode: u32) -> Vec<u8> {
    const CENTRAL_HEADER: [u8; 4] = [0x50, 0x4b, 0x01, 0x02];
    const END_OF_CENTRAL_DIRECTORY: [u8; 4] = [0x50, 0x4b, 0x05, 0x06];
    let u16_at = |bytes: &[u8], at: usize| u16::from_le_bytes([bytes[at], bytes[at + 1]]) as usize;

    let end = bytes
        .windows(4)
        .rposition(|window| window == END_OF_CENTRAL_DIRECTORY)
        .expect("container has no end of central directory record");
    let mut offset =
        u32::from_le_bytes(bytes[end + 16..end + 20].try_into().unwrap()) as usize;
    while bytes[offset..].starts_with(&CENTRAL_HEADER) {
        let name_len = u16_at(&bytes, offset + 28);
        let extra_len = u16_at(&bytes, offset + 30);
        let comment_len = u16_at(&bytes, offset + 32);
        if &bytes[offset + 46..offset + 46 + name_len] == name.as_bytes() {
            let attributes = (mode << 16).to_le_bytes();
            bytes[offset + 38..offset + 42].copy_from_slice(&attributes);
            return bytes;
        }
        offset += 46 + name_len + extra_len + comment_len;
    }
    panic!("member '{name}' not found");
}
