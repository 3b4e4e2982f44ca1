//! Shared test infrastructure: a scripted stand-in for the tool-under-test
//!
//! The fake tool understands just enough of the query CLI to exercise the
//! harness end to end: `--root`, `--dbpath`, `-h/--help`, `-v/--verbose`,
//! `-Q/--query` with `-c/--changelog`, reading the materialized database.

#![allow(dead_code)] // Test utilities may not all be used in every test file

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

pub const FAKE_TOOL: &str = r#"#!/bin/sh
root=/
dbpath=/var/lib/pacman
op=
changelog=0
verbose=0
targets=
while [ $# -gt 0 ]; do
    case "$1" in
        --root) root=$2; shift 2 ;;
        --root=*) root=${1#--root=}; shift ;;
        --dbpath) dbpath=$2; shift 2 ;;
        --dbpath=*) dbpath=${1#--dbpath=}; shift ;;
        -h|--help) op=help; shift ;;
        -v|--verbose) verbose=1; shift ;;
        -Q|--query) op=query; shift ;;
        -Qc) op=query; changelog=1; shift ;;
        -c|--changelog) changelog=1; shift ;;
        -*) echo "Error: unknown option $1" >&2; exit 1 ;;
        *) targets="$targets $1"; shift ;;
    esac
done

if [ "$verbose" = 1 ]; then
    echo "Root      : $root"
    echo "DB Path   : $dbpath"
fi

field() {
    sed -n "/^%$1%\$/{n;p;}" "$2"
}

case "$op" in
    help)
        echo "Usage: pacmanpp <operation>"
        echo "operations:"
        echo "  pacmanpp {-h, --help}                  Show this help message"
        echo "  pacmanpp {-Q, --query} [package(s)]    Query installed packages"
        exit 0
        ;;
    query) ;;
    *)
        echo "Error: no operation specified (use -h for help)" >&2
        exit 1
        ;;
esac

status=0
if [ -z "$targets" ]; then
    for d in "$dbpath"/local/*/; do
        [ -f "$d/desc" ] || continue
        echo "$(field NAME "$d/desc") $(field VERSION "$d/desc")"
    done
    exit 0
fi

for name in $targets; do
    found=
    for d in "$dbpath"/local/"$name"-*; do
        [ -f "$d/desc" ] || continue
        [ "$(field NAME "$d/desc")" = "$name" ] || continue
        found=$d
    done
    if [ -z "$found" ]; then
        echo "Error: package $name not found" >&2
        status=1
        continue
    fi
    if [ "$changelog" = 1 ]; then
        echo "Changelog for $name:"
        [ -f "$found/changelog" ] && cat "$found/changelog"
        echo
    else
        echo "$name $(field VERSION "$found/desc")"
    fi
done
exit $status
"#;

/// A tool that gets every answer wrong
pub const BROKEN_TOOL: &str = "#!/bin/sh\necho nonsense\nexit 7\n";

fn scratch_dir() -> PathBuf {
    Path::new(env!("CARGO_TARGET_TMPDIR")).join(format!("pptest-tools-{}", std::process::id()))
}

/// Write an executable script. The temp-then-rename keeps a half-written
/// file from ever being exec'd.
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    fs::create_dir_all(dir).unwrap();
    let path = dir.join(name);
    let tmp = dir.join(format!(".{name}.tmp"));
    fs::write(&tmp, body).unwrap();
    fs::set_permissions(&tmp, fs::Permissions::from_mode(0o755)).unwrap();
    fs::rename(&tmp, &path).unwrap();
    path
}

/// Path to the fake tool-under-test, named `pacmanpp`
pub fn fake_tool() -> &'static Path {
    static TOOL: OnceLock<PathBuf> = OnceLock::new();
    TOOL.get_or_init(|| write_script(&scratch_dir().join("good"), "pacmanpp", FAKE_TOOL))
}

/// Path to a tool that fails every scenario, also named `pacmanpp`
pub fn broken_tool() -> &'static Path {
    static TOOL: OnceLock<PathBuf> = OnceLock::new();
    TOOL.get_or_init(|| write_script(&scratch_dir().join("broken"), "pacmanpp", BROKEN_TOOL))
}
