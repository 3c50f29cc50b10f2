//! Filesystem command handlers.
//!
//! Every path operand goes through the session's sandbox guard before the
//! filesystem is touched.

use std::fs;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{Error, Result};
use crate::sandbox::{FollowMode, ResolvedPath};
use crate::session::Session;

use super::{expect_args, Outcome, Terminal};

fn output(text: impl Into<String>) -> Result<Outcome> {
    Ok(Outcome::Output(text.into()))
}

fn io_err(session: &Session, path: &ResolvedPath) -> impl FnOnce(std::io::Error) -> Error {
    let display = session.display(path);
    move |e| Error::from_io(display, e)
}

pub(super) fn ls(_terminal: &Terminal, session: &mut Session, args: &[String]) -> Result<Outcome> {
    expect_args("ls", args, 0, 1)?;
    let target = session.resolve(args.first().map(String::as_str).unwrap_or("."))?;

    let meta = fs::metadata(target.as_path()).map_err(io_err(session, &target))?;
    if !meta.is_dir() {
        let name = target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        return output(name);
    }

    let mut entries = Vec::new();
    for entry in fs::read_dir(target.as_path()).map_err(io_err(session, &target))? {
        let entry = entry.map_err(io_err(session, &target))?;
        let mut name = entry.file_name().to_string_lossy().into_owned();
        if lists_as_dir(session, &target, &entry) {
            name.push('/');
        }
        entries.push(name);
    }
    entries.sort();
    output(entries.join("\n"))
}

/// True for directories and for symlinks resolving to a directory inside the
/// sandbox. Links leading outside are never probed.
fn lists_as_dir(session: &Session, dir: &ResolvedPath, entry: &fs::DirEntry) -> bool {
    match entry.file_type() {
        Ok(file_type) if file_type.is_dir() => true,
        Ok(file_type) if file_type.is_symlink() => entry
            .file_name()
            .to_str()
            .and_then(|name| session.root().resolve(dir, name, FollowMode::Follow).ok())
            .is_some_and(|resolved| resolved.as_path().is_dir()),
        _ => false,
    }
}

pub(super) fn pwd(_terminal: &Terminal, session: &mut Session, args: &[String]) -> Result<Outcome> {
    expect_args("pwd", args, 0, 0)?;
    output(session.pwd())
}

pub(super) fn cd(_terminal: &Terminal, session: &mut Session, args: &[String]) -> Result<Outcome> {
    expect_args("cd", args, 0, 1)?;
    match args.first() {
        Some(path) => output(session.cd(path)?),
        None => output(session.cd_root()),
    }
}

pub(super) fn mkdir(_terminal: &Terminal, session: &mut Session, args: &[String]) -> Result<Outcome> {
    expect_args("mkdir", args, 1, 1)?;
    let target = session.resolve(&args[0])?;

    fs::create_dir_all(target.as_path()).map_err(io_err(session, &target))?;
    output(format!("Created: {}", session.display(&target)))
}

pub(super) fn rm(_terminal: &Terminal, session: &mut Session, args: &[String]) -> Result<Outcome> {
    let (recursive, operands) = match args.split_first() {
        Some((flag, rest)) if matches!(flag.as_str(), "-r" | "-R" | "-rf" | "--recursive") => {
            (true, rest)
        }
        _ => (false, args),
    };
    expect_args("rm", operands, 1, 1)?;

    let target = session.resolve_no_follow(&operands[0])?;
    if target.as_path() == session.root().path() {
        return Err(Error::InvalidArgument(
            "rm: refusing to remove the sandbox root".to_string(),
        ));
    }
    let display = session.display(&target);

    let meta = fs::symlink_metadata(target.as_path()).map_err(io_err(session, &target))?;
    let message = if meta.is_dir() {
        if recursive {
            fs::remove_dir_all(target.as_path()).map_err(io_err(session, &target))?;
            format!("Removed directory tree: {}", display)
        } else {
            let mut children = fs::read_dir(target.as_path()).map_err(io_err(session, &target))?;
            if children.next().is_some() {
                return Err(Error::InvalidArgument(format!(
                    "rm: {}: directory not empty (use rm -r)",
                    display
                )));
            }
            fs::remove_dir(target.as_path()).map_err(io_err(session, &target))?;
            format!("Removed directory: {}", display)
        }
    } else {
        fs::remove_file(target.as_path()).map_err(io_err(session, &target))?;
        if meta.file_type().is_symlink() {
            format!("Removed link: {}", display)
        } else {
            format!("Removed file: {}", display)
        }
    };

    session.repair_cwd();
    output(message)
}

pub(super) fn touch(_terminal: &Terminal, session: &mut Session, args: &[String]) -> Result<Outcome> {
    expect_args("touch", args, 1, 1)?;
    let target = session.resolve(&args[0])?;

    create_parent(session, &target)?;
    let file = if target.as_path().is_dir() {
        fs::File::open(target.as_path())
    } else {
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(target.as_path())
    }
    .map_err(io_err(session, &target))?;
    file.set_modified(SystemTime::now())
        .map_err(io_err(session, &target))?;

    output(format!("Touched: {}", session.display(&target)))
}

pub(super) fn cat(terminal: &Terminal, session: &mut Session, args: &[String]) -> Result<Outcome> {
    expect_args("cat", args, 1, 1)?;
    let target = session.resolve(&args[0])?;
    let display = session.display(&target);

    let meta = fs::metadata(target.as_path()).map_err(io_err(session, &target))?;
    if meta.is_dir() {
        return Err(Error::IsADirectory(display));
    }
    let limit = terminal.config().cat_max_bytes;
    if meta.len() > limit {
        return Err(Error::InvalidArgument(format!(
            "cat: {}: file too large ({} bytes, limit {})",
            display,
            meta.len(),
            limit
        )));
    }

    let bytes = fs::read(target.as_path()).map_err(io_err(session, &target))?;
    let text = String::from_utf8_lossy(&bytes);
    output(text.strip_suffix('\n').unwrap_or(&text))
}

/// Resolves the final destination of a move or copy.
///
/// If `dst` names an existing directory the source keeps its name inside it.
fn destination(session: &Session, src: &ResolvedPath, dst: &str, mode: FollowMode) -> Result<ResolvedPath> {
    let followed = session.resolve(dst)?;
    if followed.as_path().is_dir() {
        let name = src
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| Error::InvalidArgument(format!("{}: has no file name", dst)))?;
        return session.root().resolve(&followed, &name, mode);
    }
    match mode {
        FollowMode::Follow => Ok(followed),
        FollowMode::NoFollowFinal => session.resolve_no_follow(dst),
    }
}

fn create_parent(session: &Session, target: &ResolvedPath) -> Result<()> {
    if let Some(parent) = session.root().parent_of(target) {
        fs::create_dir_all(parent.as_path()).map_err(io_err(session, target))?;
    }
    Ok(())
}

pub(super) fn mv(_terminal: &Terminal, session: &mut Session, args: &[String]) -> Result<Outcome> {
    expect_args("mv", args, 2, 2)?;
    let src = session.resolve_no_follow(&args[0])?;
    if src.as_path() == session.root().path() {
        return Err(Error::InvalidArgument(
            "mv: refusing to move the sandbox root".to_string(),
        ));
    }
    fs::symlink_metadata(src.as_path()).map_err(io_err(session, &src))?;

    let dst = destination(session, &src, &args[1], FollowMode::NoFollowFinal)?;
    create_parent(session, &dst)?;
    fs::rename(src.as_path(), dst.as_path()).map_err(io_err(session, &src))?;

    let message = format!("Moved {} -> {}", session.display(&src), session.display(&dst));
    session.repair_cwd();
    output(message)
}

pub(super) fn cp(_terminal: &Terminal, session: &mut Session, args: &[String]) -> Result<Outcome> {
    expect_args("cp", args, 2, 2)?;
    let src = session.resolve(&args[0])?;
    let meta = fs::metadata(src.as_path()).map_err(io_err(session, &src))?;

    let dst = destination(session, &src, &args[1], FollowMode::Follow)?;
    if same_file(src.as_path(), dst.as_path()) {
        return Err(Error::InvalidArgument(format!(
            "cp: {} and {} are the same file",
            session.display(&src),
            session.display(&dst)
        )));
    }
    if meta.is_dir() {
        if dst.as_path().starts_with(src.as_path()) {
            return Err(Error::InvalidArgument(format!(
                "cp: cannot copy {} into itself",
                session.display(&src)
            )));
        }
        if dst.as_path().exists() {
            return Err(Error::AlreadyExists(session.display(&dst)));
        }
        create_parent(session, &dst)?;
        copy_tree(src.as_path(), dst.as_path()).map_err(io_err(session, &src))?;
    } else {
        create_parent(session, &dst)?;
        fs::copy(src.as_path(), dst.as_path()).map_err(io_err(session, &src))?;
    }

    output(format!(
        "Copied {} -> {}",
        session.display(&src),
        session.display(&dst)
    ))
}

#[cfg(unix)]
fn same_file(a: &Path, b: &Path) -> bool {
    use std::os::unix::fs::MetadataExt;
    if a == b {
        return true;
    }
    match (fs::metadata(a), fs::metadata(b)) {
        (Ok(a), Ok(b)) => a.dev() == b.dev() && a.ino() == b.ino(),
        _ => false,
    }
}

#[cfg(not(unix))]
fn same_file(a: &Path, b: &Path) -> bool {
    a == b
}

/// Copies a directory tree. Symlinks are recreated, never followed.
fn copy_tree(src: &Path, dst: &Path) -> std::io::Result<()> {
    fs::create_dir(dst)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        let target = dst.join(entry.file_name());
        if file_type.is_dir() {
            copy_tree(&entry.path(), &target)?;
        } else if file_type.is_symlink() {
            copy_link(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn copy_link(src: &Path, dst: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(fs::read_link(src)?, dst)
}

#[cfg(not(unix))]
fn copy_link(src: &Path, _dst: &Path) -> std::io::Result<()> {
    tracing::warn!(path = %src.display(), "skipping symlink while copying tree");
    Ok(())
}

#[cfg(unix)]
fn mode_string(meta: &fs::Metadata) -> String {
    use std::os::unix::fs::MetadataExt;
    format!("{:#o}", meta.mode())
}

#[cfg(not(unix))]
fn mode_string(meta: &fs::Metadata) -> String {
    if meta.permissions().readonly() {
        "readonly".to_string()
    } else {
        "read-write".to_string()
    }
}

pub(super) fn stat(_terminal: &Terminal, session: &mut Session, args: &[String]) -> Result<Outcome> {
    expect_args("stat", args, 1, 1)?;
    let target = session.resolve(&args[0])?;
    let meta = fs::metadata(target.as_path()).map_err(io_err(session, &target))?;

    let kind = if meta.is_dir() {
        "directory"
    } else if meta.is_file() {
        "file"
    } else {
        "other"
    };
    let mtime = meta
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| format!("{:.3}", d.as_secs_f64()))
        .unwrap_or_else(|| "unknown".to_string());

    output(format!(
        "path: {}\ntype: {}\nsize: {} bytes\nmode: {}\nmtime: {}",
        session.display(&target),
        kind,
        meta.len(),
        mode_string(&meta),
        mtime
    ))
}

#[cfg(test)]
mod tests {
    use super::super::tests::{run, terminal};
    use crate::error::{Error, ErrorKind};

    #[test]
    fn mkdir_then_ls_lists_directory() {
        let (_dir, terminal) = terminal();
        let mut session = terminal.session();

        assert_eq!(run(&terminal, &mut session, "mkdir foo").unwrap(), "Created: /foo");
        assert_eq!(run(&terminal, &mut session, "ls").unwrap(), "foo/");

        assert_eq!(run(&terminal, &mut session, "rm foo").unwrap(), "Removed directory: /foo");
        assert_eq!(run(&terminal, &mut session, "ls").unwrap(), "");
    }

    #[test]
    fn mkdir_creates_parents_and_tolerates_existing() {
        let (_dir, terminal) = terminal();
        let mut session = terminal.session();

        run(&terminal, &mut session, "mkdir a/b/c").unwrap();
        run(&terminal, &mut session, "mkdir a/b/c").unwrap();
        assert!(terminal.root().path().join("a/b/c").is_dir());
    }

    #[test]
    fn ls_sorts_and_marks_directories() {
        let (_dir, terminal) = terminal();
        let mut session = terminal.session();
        let root = terminal.root().path();
        std::fs::create_dir(root.join("beta")).unwrap();
        std::fs::write(root.join("alpha.txt"), "").unwrap();
        std::fs::write(root.join("gamma"), "").unwrap();

        assert_eq!(
            run(&terminal, &mut session, "ls").unwrap(),
            "alpha.txt\nbeta/\ngamma"
        );
        assert_eq!(run(&terminal, &mut session, "ls alpha.txt").unwrap(), "alpha.txt");
    }

    #[test]
    fn ls_missing_path_is_not_found() {
        let (_dir, terminal) = terminal();
        let mut session = terminal.session();

        let err = terminal.execute(&mut session, "ls nowhere").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn cd_without_argument_returns_to_root() {
        let (_dir, terminal) = terminal();
        let mut session = terminal.session();
        run(&terminal, &mut session, "mkdir deep/er").unwrap();

        assert_eq!(run(&terminal, &mut session, "cd deep/er").unwrap(), "/deep/er");
        assert_eq!(run(&terminal, &mut session, "pwd").unwrap(), "/deep/er");
        assert_eq!(run(&terminal, &mut session, "cd").unwrap(), "/");
    }

    #[test]
    fn repeated_cd_parent_never_leaves_root() {
        let (_dir, terminal) = terminal();
        let mut session = terminal.session();
        run(&terminal, &mut session, "mkdir a").unwrap();
        run(&terminal, &mut session, "cd a").unwrap();

        assert_eq!(run(&terminal, &mut session, "cd ..").unwrap(), "/");
        for _ in 0..3 {
            let err = terminal.execute(&mut session, "cd ..").unwrap_err();
            assert_eq!(err.kind(), ErrorKind::PermissionDenied);
            assert_eq!(run(&terminal, &mut session, "pwd").unwrap(), "/");
        }
    }

    #[test]
    fn touch_creates_file_with_parents() {
        let (_dir, terminal) = terminal();
        let mut session = terminal.session();

        assert_eq!(
            run(&terminal, &mut session, "touch notes/today.txt").unwrap(),
            "Touched: /notes/today.txt"
        );
        let path = terminal.root().path().join("notes/today.txt");
        assert!(path.is_file());
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 0);
    }

    #[test]
    fn touch_keeps_existing_contents() {
        let (_dir, terminal) = terminal();
        let mut session = terminal.session();
        let path = terminal.root().path().join("keep.txt");
        std::fs::write(&path, "content").unwrap();

        run(&terminal, &mut session, "touch keep.txt").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "content");
    }

    #[test]
    fn cat_prints_file_and_rejects_directories() {
        let (_dir, terminal) = terminal();
        let mut session = terminal.session();
        std::fs::write(terminal.root().path().join("hello.txt"), "hello\nworld\n").unwrap();
        run(&terminal, &mut session, "mkdir d").unwrap();

        assert_eq!(run(&terminal, &mut session, "cat hello.txt").unwrap(), "hello\nworld");
        let err = terminal.execute(&mut session, "cat d").unwrap_err();
        assert!(matches!(err, Error::IsADirectory(ref p) if p == "/d"));
    }

    #[test]
    fn cat_refuses_files_over_limit() {
        let (_dir, terminal) = terminal();
        let mut session = terminal.session();
        let big = vec![b'x'; (terminal.config().cat_max_bytes + 1) as usize];
        std::fs::write(terminal.root().path().join("big.bin"), big).unwrap();

        let err = terminal.execute(&mut session, "cat big.bin").unwrap_err();
        assert!(err.to_string().contains("too large"));
    }

    #[test]
    fn rm_requires_recursive_for_non_empty_directory() {
        let (_dir, terminal) = terminal();
        let mut session = terminal.session();
        run(&terminal, &mut session, "touch tree/leaf.txt").unwrap();

        let err = terminal.execute(&mut session, "rm tree").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert!(terminal.root().path().join("tree").exists());

        assert_eq!(
            run(&terminal, &mut session, "rm -r tree").unwrap(),
            "Removed directory tree: /tree"
        );
        assert!(!terminal.root().path().join("tree").exists());
    }

    #[test]
    fn rm_missing_operand() {
        let (_dir, terminal) = terminal();
        let mut session = terminal.session();

        for line in ["rm", "rm -r", "del"] {
            let err = terminal.execute(&mut session, line).unwrap_err();
            assert_eq!(err.to_string(), "rm: missing operand", "line {:?}", line);
        }
    }

    #[test]
    fn rm_refuses_sandbox_root() {
        let (_dir, terminal) = terminal();
        let mut session = terminal.session();

        for line in ["rm -r .", "rm -r ''"] {
            let err = terminal.execute(&mut session, line).unwrap_err();
            assert!(err.to_string().contains("sandbox root"), "line {:?}", line);
        }
        assert!(terminal.root().path().is_dir());
    }

    #[test]
    fn rm_of_working_directory_moves_session_up() {
        let (_dir, terminal) = terminal();
        let mut session = terminal.session();
        run(&terminal, &mut session, "mkdir a/b").unwrap();
        run(&terminal, &mut session, "cd a/b").unwrap();

        run(&terminal, &mut session, "rm -r ../../a").unwrap();
        assert_eq!(run(&terminal, &mut session, "pwd").unwrap(), "/");
    }

    #[test]
    fn mv_renames_and_moves_into_directories() {
        let (_dir, terminal) = terminal();
        let mut session = terminal.session();
        run(&terminal, &mut session, "touch a.txt").unwrap();
        run(&terminal, &mut session, "mkdir dest").unwrap();

        assert_eq!(
            run(&terminal, &mut session, "mv a.txt b.txt").unwrap(),
            "Moved /a.txt -> /b.txt"
        );
        assert_eq!(
            run(&terminal, &mut session, "mv b.txt dest").unwrap(),
            "Moved /b.txt -> /dest/b.txt"
        );
        assert_eq!(
            run(&terminal, &mut session, "mv dest/b.txt new/parent/c.txt").unwrap(),
            "Moved /dest/b.txt -> /new/parent/c.txt"
        );
        assert!(terminal.root().path().join("new/parent/c.txt").is_file());
    }

    #[test]
    fn mv_missing_source_is_not_found() {
        let (_dir, terminal) = terminal();
        let mut session = terminal.session();

        let err = terminal.execute(&mut session, "mv ghost x").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        let err = terminal.execute(&mut session, "mv onlyone").unwrap_err();
        assert_eq!(err.to_string(), "mv: missing operand");
    }

    #[test]
    fn cp_copies_files_and_trees() {
        let (_dir, terminal) = terminal();
        let mut session = terminal.session();
        let root = terminal.root().path().to_path_buf();
        std::fs::create_dir_all(root.join("src/nested")).unwrap();
        std::fs::write(root.join("src/nested/file.txt"), "data").unwrap();

        assert_eq!(
            run(&terminal, &mut session, "cp src/nested/file.txt copy.txt").unwrap(),
            "Copied /src/nested/file.txt -> /copy.txt"
        );
        assert_eq!(std::fs::read_to_string(root.join("copy.txt")).unwrap(), "data");

        run(&terminal, &mut session, "cp src backup").unwrap();
        assert_eq!(
            std::fs::read_to_string(root.join("backup/nested/file.txt")).unwrap(),
            "data"
        );

        let err = terminal.execute(&mut session, "cp src/nested backup").unwrap_err();
        assert!(matches!(err, Error::AlreadyExists(ref p) if p == "/backup/nested"));
    }

    #[test]
    fn cp_into_existing_directory_keeps_name() {
        let (_dir, terminal) = terminal();
        let mut session = terminal.session();
        run(&terminal, &mut session, "touch f.txt").unwrap();
        run(&terminal, &mut session, "mkdir box").unwrap();

        assert_eq!(
            run(&terminal, &mut session, "cp f.txt box").unwrap(),
            "Copied /f.txt -> /box/f.txt"
        );
    }

    #[test]
    fn cp_refuses_directory_into_itself() {
        let (_dir, terminal) = terminal();
        let mut session = terminal.session();
        run(&terminal, &mut session, "mkdir loop").unwrap();

        let err = terminal.execute(&mut session, "cp loop loop/inner").unwrap_err();
        assert!(err.to_string().contains("into itself"));
    }

    #[test]
    fn cp_onto_itself_leaves_file_intact() {
        let (_dir, terminal) = terminal();
        let mut session = terminal.session();
        let file = terminal.root().path().join("f.txt");
        std::fs::write(&file, "important data").unwrap();

        for line in ["cp f.txt f.txt", "cp f.txt ."] {
            let err = terminal.execute(&mut session, line).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidArgument, "line {:?}", line);
            assert!(err.to_string().contains("are the same file"));
            assert_eq!(std::fs::read_to_string(&file).unwrap(), "important data");
        }
    }

    #[cfg(unix)]
    #[test]
    fn cp_onto_hard_link_of_source_is_refused() {
        let (_dir, terminal) = terminal();
        let mut session = terminal.session();
        let root = terminal.root().path().to_path_buf();
        std::fs::write(root.join("f.txt"), "important data").unwrap();
        std::fs::hard_link(root.join("f.txt"), root.join("twin.txt")).unwrap();

        let err = terminal.execute(&mut session, "cp f.txt twin.txt").unwrap_err();
        assert_eq!(
            err.to_string(),
            "cp: /f.txt and /twin.txt are the same file"
        );
        assert_eq!(std::fs::read_to_string(root.join("twin.txt")).unwrap(), "important data");
    }

    #[test]
    fn stat_reports_type_and_size() {
        let (_dir, terminal) = terminal();
        let mut session = terminal.session();
        std::fs::write(terminal.root().path().join("five.txt"), "12345").unwrap();

        let text = run(&terminal, &mut session, "stat five.txt").unwrap();
        assert!(text.contains("path: /five.txt"));
        assert!(text.contains("type: file"));
        assert!(text.contains("size: 5 bytes"));
        assert!(text.contains("mode: "));
        assert!(text.contains("mtime: "));
    }

    #[test]
    fn commands_reject_extra_operands() {
        let (_dir, terminal) = terminal();
        let mut session = terminal.session();

        let err = terminal.execute(&mut session, "pwd extra").unwrap_err();
        assert_eq!(err.to_string(), "pwd: too many arguments");
    }

    #[test]
    fn traversal_outside_root_is_denied_for_every_command() {
        let (_dir, terminal) = terminal();
        let mut session = terminal.session();

        for line in [
            "ls ..",
            "mkdir ../escape",
            "touch ../escape.txt",
            "cat ../../etc/passwd",
            "rm ../x",
            "stat ..",
            "cp ../x y",
            "mv ../x y",
        ] {
            let err = terminal.execute(&mut session, line).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::PermissionDenied, "line {:?}", line);
        }
        assert!(!terminal.root().path().parent().unwrap().join("escape").exists());
    }

    #[cfg(unix)]
    #[test]
    fn symlink_to_etc_is_rejected_when_followed() {
        let (_dir, terminal) = terminal();
        let mut session = terminal.session();
        std::os::unix::fs::symlink("/etc", terminal.root().path().join("etc")).unwrap();

        for line in ["cd etc", "ls etc", "cat etc/passwd", "stat etc", "cp etc/hostname x"] {
            let err = terminal.execute(&mut session, line).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::PermissionDenied, "line {:?}", line);
        }
        assert_eq!(run(&terminal, &mut session, "ls").unwrap(), "etc");
    }

    #[cfg(unix)]
    #[test]
    fn rm_removes_outside_link_without_touching_target() {
        let (_dir, terminal) = terminal();
        let outside = tempfile::TempDir::new().unwrap();
        std::fs::write(outside.path().join("precious.txt"), "keep").unwrap();
        let mut session = terminal.session();
        std::os::unix::fs::symlink(outside.path(), terminal.root().path().join("out")).unwrap();

        assert_eq!(
            run(&terminal, &mut session, "rm -r out").unwrap(),
            "Removed link: /out"
        );
        assert!(outside.path().join("precious.txt").exists());
    }

    #[cfg(unix)]
    #[test]
    fn touch_through_dangling_outside_link_is_denied() {
        let (_dir, terminal) = terminal();
        let outside = tempfile::TempDir::new().unwrap();
        let victim = outside.path().join("created-by-link.txt");
        let mut session = terminal.session();
        std::os::unix::fs::symlink(&victim, terminal.root().path().join("dangling")).unwrap();

        let err = terminal.execute(&mut session, "touch dangling").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PermissionDenied);
        assert!(!victim.exists());
    }

    #[cfg(unix)]
    #[test]
    fn cp_tree_recreates_links_instead_of_following() {
        let (_dir, terminal) = terminal();
        let mut session = terminal.session();
        let root = terminal.root().path().to_path_buf();
        std::fs::create_dir(root.join("tree")).unwrap();
        std::os::unix::fs::symlink("/etc", root.join("tree/etc")).unwrap();

        run(&terminal, &mut session, "cp tree copy").unwrap();
        let copied = root.join("copy/etc");
        assert!(std::fs::symlink_metadata(&copied).unwrap().file_type().is_symlink());

        let err = terminal.execute(&mut session, "ls copy/etc").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PermissionDenied);
    }

    #[cfg(unix)]
    #[test]
    fn ls_marks_links_to_directories_inside_root() {
        let (_dir, terminal) = terminal();
        let mut session = terminal.session();
        let root = terminal.root().path().to_path_buf();
        run(&terminal, &mut session, "mkdir real/inner").unwrap();
        std::fs::write(root.join("file.txt"), "").unwrap();
        std::os::unix::fs::symlink("real/inner", root.join("shortcut")).unwrap();
        std::os::unix::fs::symlink("file.txt", root.join("alias")).unwrap();
        std::os::unix::fs::symlink("/etc", root.join("etc")).unwrap();

        assert_eq!(
            run(&terminal, &mut session, "ls").unwrap(),
            "alias\netc\nfile.txt\nreal/\nshortcut/"
        );
    }
}
