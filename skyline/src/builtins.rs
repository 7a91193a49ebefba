//! The builtin registry and the host interface builtins talk through.
//!
//! Generic builtins report misuse (wrong argument count or kind) with error
//! objects. The informational accessors `OS_` and `USER_` are different: an
//! unrecognized key gives back a plain string explaining how to get help,
//! not an error, so callers have to look at the string to detect misuse.

use std::collections::HashMap;
use std::io::{BufRead, Write};

use tracing::{debug, warn};

use crate::object::Object;
use crate::types::{Builtin, Key, Type};


// Host
// ------------------------------------------------------------------------------------------------

/// Operating system properties available through `OS_`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsKey {
    Name,
    Arch,
}

impl OsKey {
    pub fn parse(key: &str) -> Option<OsKey> {
        match key {
            "os_name" => Some(OsKey::Name),
            "os_arch" => Some(OsKey::Arch),
            _ => None,
        }
    }
}

/// User properties available through `USER_`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserKey {
    Name,
    Gid,
    Uid,
    Username,
    HomeDir,
}

impl UserKey {
    pub fn parse(key: &str) -> Option<UserKey> {
        match key {
            "name" => Some(UserKey::Name),
            "gid" => Some(UserKey::Gid),
            "uid" => Some(UserKey::Uid),
            "username" => Some(UserKey::Username),
            "hdir" => Some(UserKey::HomeDir),
            _ => None,
        }
    }
}

/// Everything builtins need from the outside world.
pub trait Host {
    /// Write text to standard output, without adding anything.
    fn write(&mut self, text: &str);

    /// Read one line from standard input, including its terminator.
    /// Returns `None` at end of input.
    fn read_line(&mut self) -> Option<String>;

    fn os_info(&self, key: OsKey) -> Result<String, String>;

    fn user_info(&self, key: UserKey) -> Result<String, String>;
}

/// Host backed by the process's standard streams and the running system.
#[derive(Default)]
pub struct StdHost;

impl Host for StdHost {
    fn write(&mut self, text: &str) {
        let mut out = std::io::stdout().lock();
        if let Err(e) = out.write_all(text.as_bytes()).and_then(|_| out.flush()) {
            warn!("failed to write to stdout: {}", e);
        }
    }

    fn read_line(&mut self) -> Option<String> {
        let mut line = String::new();
        match std::io::stdin().lock().read_line(&mut line) {
            Ok(0) => None,
            Ok(_) => Some(line),
            Err(e) => {
                warn!("failed to read from stdin: {}", e);
                None
            },
        }
    }

    fn os_info(&self, key: OsKey) -> Result<String, String> {
        match key {
            OsKey::Name => Ok(std::env::consts::OS.to_string()),
            OsKey::Arch => Ok(std::env::consts::ARCH.to_string()),
        }
    }

    fn user_info(&self, key: UserKey) -> Result<String, String> {
        let user = system::current_user()?;
        match key {
            UserKey::Name => Ok(user.name),
            UserKey::Gid => user.gid.ok_or_else(|| "gid is not available on this platform".to_string()),
            UserKey::Uid => user.uid.ok_or_else(|| "uid is not available on this platform".to_string()),
            UserKey::Username => Ok(user.username),
            UserKey::HomeDir => Ok(user.home),
        }
    }
}

mod system {
    use std::env;

    #[derive(Default, Debug)]
    pub(super) struct User {
        pub username: String,
        pub name: String,
        pub home: String,
        pub uid: Option<String>,
        pub gid: Option<String>,
    }

    fn from_environment() -> Result<User, String> {
        let username = env::var("USER")
            .or_else(|_| env::var("USERNAME"))
            .map_err(|_| "could not determine the current user".to_string())?;
        let home = env::var("HOME").or_else(|_| env::var("USERPROFILE")).unwrap_or_default();
        Ok(User {
            name: username.clone(),
            username,
            home,
            ..Default::default()
        })
    }

    /// Look up the current user. On Unix the owner of `/proc/self` gives the
    /// effective uid and gid, and `/etc/passwd` the rest.
    #[cfg(unix)]
    pub(super) fn current_user() -> Result<User, String> {
        use std::os::unix::fs::MetadataExt;

        let meta = match std::fs::metadata("/proc/self") {
            Ok(meta) => meta,
            Err(_) => return from_environment(),
        };
        let uid = meta.uid().to_string();
        let gid = meta.gid().to_string();

        let passwd = std::fs::read_to_string("/etc/passwd").map_err(|e| e.to_string())?;
        for line in passwd.lines() {
            let fields: Vec<&str> = line.split(':').collect();
            if fields.len() >= 6 && fields[2] == uid {
                return Ok(User {
                    username: fields[0].to_string(),
                    name: fields[4].split(',').next().unwrap_or_default().to_string(),
                    home: fields[5].to_string(),
                    uid: Some(uid),
                    gid: Some(gid),
                });
            }
        }

        let mut user = from_environment()?;
        user.uid = Some(uid);
        user.gid = Some(gid);
        Ok(user)
    }

    #[cfg(not(unix))]
    pub(super) fn current_user() -> Result<User, String> {
        from_environment()
    }
}


// Registry
// ------------------------------------------------------------------------------------------------

/// Immutable table of builtins. Built once, then only read.
pub struct Builtins(HashMap<&'static str, Builtin>);

macro_rules! builtin {
    ($m: ident, $e: ident) => {
        builtin!($m, stringify!($e) => $e)
    };
    ($m: ident, $name: expr => $e: ident) => {
        $m.insert(
            $name,
            Builtin::new($e, Key::from($name)),
        )
    };
}

impl Builtins {
    /// The standard set of builtins.
    pub fn standard() -> Builtins {
        let mut m = HashMap::new();
        builtin!(m, length);
        builtin!(m, first);
        builtin!(m, last);
        builtin!(m, rest);
        builtin!(m, push);
        builtin!(m, print);
        builtin!(m, println);
        builtin!(m, sprint);
        builtin!(m, input);
        builtin!(m, "OS_" => os);
        builtin!(m, "USER_" => user);
        builtin!(m, "SkyLine__" => help);
        Builtins(m)
    }

    pub fn get(&self, name: &str) -> Option<Builtin> {
        self.0.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// All registered names, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.0.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

lazy_static! {
    /// The standard registry, shared by everything in the process.
    pub static ref BUILTINS: Builtins = Builtins::standard();
}


// Argument checking
// ------------------------------------------------------------------------------------------------

fn arg_count(args: &[Object], want: usize) -> Result<(), Object> {
    if args.len() == want {
        Ok(())
    } else {
        Err(Object::error(format!("wrong number of arguments. got={}, want={}", args.len(), want)))
    }
}

fn arg_mismatch(name: &str, want: &str, got: &Object) -> Object {
    Object::error(format!("argument to `{}` must be {}, got {}", name, want, got.type_of()))
}

fn array_arg<'a>(name: &str, args: &'a [Object]) -> Result<&'a [Object], Object> {
    arg_count(args, 1)?;
    args[0].get_array().map(Vec::as_slice).ok_or_else(|| arg_mismatch(name, "Array", &args[0]))
}

/// Run a builtin body that reports failure through `Err`.
fn run(f: impl FnOnce() -> Result<Object, Object>) -> Object {
    f().unwrap_or_else(|e| e)
}


// Generic builtins
// ------------------------------------------------------------------------------------------------

pub fn length(args: &[Object], _: &mut dyn Host) -> Object {
    run(|| {
        arg_count(args, 1)?;
        match &args[0] {
            Object::Str(x) => Ok(Object::int(x.len() as i64)),
            Object::Array(x) => Ok(Object::int(x.len() as i64)),
            other => Err(arg_mismatch("length", &format!("{} or {}", Type::String, Type::Array), other)),
        }
    })
}

pub fn first(args: &[Object], _: &mut dyn Host) -> Object {
    run(|| {
        let elements = array_arg("first", args)?;
        Ok(elements.first().cloned().unwrap_or(Object::Nil))
    })
}

pub fn last(args: &[Object], _: &mut dyn Host) -> Object {
    run(|| {
        let elements = array_arg("last", args)?;
        Ok(elements.last().cloned().unwrap_or(Object::Nil))
    })
}

pub fn rest(args: &[Object], _: &mut dyn Host) -> Object {
    run(|| {
        let elements = array_arg("rest", args)?;
        if elements.is_empty() {
            return Ok(Object::Nil);
        }
        Ok(Object::array(elements[1..].to_vec()))
    })
}

pub fn push(args: &[Object], _: &mut dyn Host) -> Object {
    run(|| {
        arg_count(args, 2)?;
        let elements = args[0].get_array().ok_or_else(|| arg_mismatch("push", "Array", &args[0]))?;
        let mut ret = Vec::with_capacity(elements.len() + 1);
        ret.extend_from_slice(elements);
        ret.push(args[1].clone());
        Ok(Object::array(ret))
    })
}


// Input and output
// ------------------------------------------------------------------------------------------------

pub fn print(args: &[Object], host: &mut dyn Host) -> Object {
    for arg in args {
        host.write(&arg.to_string());
    }
    Object::str("")
}

pub fn println(args: &[Object], host: &mut dyn Host) -> Object {
    for arg in args {
        host.write(&format!("{}\n", arg));
    }
    Object::str("")
}

pub fn sprint(args: &[Object], _: &mut dyn Host) -> Object {
    match args.first() {
        Some(arg) => Object::str(arg),
        None => Object::error(format!("wrong number of arguments. got={}, want={}", 0, 1)),
    }
}

/// `input(prompt, terminator)`: prompt, then block until a non-empty line
/// is read. Both `"newline"` and `"n"` read up to the end of the line.
pub fn input(args: &[Object], host: &mut dyn Host) -> Object {
    run(|| {
        arg_count(args, 2)?;
        let terminator = args[1].to_string();
        if terminator != "newline" && terminator != "n" {
            return Err(Object::error(format!("unsupported input terminator: {}", terminator)));
        }

        host.write(&args[0].to_string());
        loop {
            let line = host.read_line().ok_or_else(|| Object::error("input: reached end of input"))?;
            let line = line.trim_end_matches(&['\n', '\r'][..]);
            if !line.is_empty() {
                return Ok(Object::str(line));
            }
        }
    })
}


// System information
// ------------------------------------------------------------------------------------------------

fn info_error(key: &str, detail: String) -> Object {
    warn!(key, %detail, "host information unavailable");
    Object::error(format!(
        "SkyLine backend (ERR_OS_INFO) => got error when working with OS information {}: {}",
        key, detail,
    ))
}

pub fn os(args: &[Object], host: &mut dyn Host) -> Object {
    run(|| {
        arg_count(args, 1)?;
        let key = args[0].to_string();
        match OsKey::parse(&key) {
            Some(k) => host.os_info(k).map(Object::str).map_err(|e| info_error(&key, e)),
            None => {
                debug!(%key, "unknown OS_ key");
                Ok(Object::str("unknown value | run SkyLine__('OS') for more information"))
            },
        }
    })
}

pub fn user(args: &[Object], host: &mut dyn Host) -> Object {
    run(|| {
        arg_count(args, 1)?;
        let key = args[0].to_string();
        match UserKey::parse(&key) {
            Some(k) => host.user_info(k).map(Object::str).map_err(|e| info_error(&key, e)),
            None => {
                debug!(%key, "unknown USER_ key");
                Ok(Object::str("unknown value | run SkyLine__('USER') for more information"))
            },
        }
    })
}

const OS_HELP: &str = "\
OS or Operating System is a standard SkyLine function to grab or view
information about the current operating system in which the SkyLine
interpreter is running on. This function has the following values

OS_(\"os_name\")    | Grabs the current operating system
OS_(\"os_arch\")    | Grabs the current operating system architecture
";

const USER_HELP: &str = "\
USER or Username is a standard SkyLine function to grab or view
information about the current user in which the SkyLine interpreter is
running on. This function has the following values

USER_(\"username\")    | Grabs the current username
USER_(\"uid\")         | Grabs the current uid
USER_(\"gid\")         | Grabs the current gid
USER_(\"name\")        | Grabs the name
USER_(\"hdir\")        | Grabs the home directory of the user
";

pub fn help(args: &[Object], _: &mut dyn Host) -> Object {
    run(|| {
        arg_count(args, 1)?;
        let topic = args[0].to_string();
        Ok(match topic.as_str() {
            "OS" => Object::str(OS_HELP),
            "USER" => Object::str(USER_HELP),
            _ => Object::str(format!("METHOD DOES NOT EXIST -> {}", topic)),
        })
    })
}
