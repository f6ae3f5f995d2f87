//! Fixed vocabulary of the Morpheus script language.
//!
//! Every lookup here is case-insensitive because the engine treats identifiers
//! that way. The tables are deliberately closed: extending them at runtime goes
//! through [`Settings::extra_builtins`](crate::config::Settings) and
//! [`Settings::extra_entry_points`](crate::config::Settings).

use std::collections::HashSet;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Storage class that qualifies a variable access (`local.x`, `level.y`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Scope {
    Local,
    Level,
    Game,
    Group,
    Parm,
    SelfEntity,
    Owner,
}

impl Scope {
    pub fn parse(word: &str) -> Option<Scope> {
        match word.to_ascii_lowercase().as_str() {
            "local" => Some(Scope::Local),
            "level" => Some(Scope::Level),
            "game" => Some(Scope::Game),
            "group" => Some(Scope::Group),
            "parm" => Some(Scope::Parm),
            "self" => Some(Scope::SelfEntity),
            "owner" => Some(Scope::Owner),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Local => "local",
            Scope::Level => "level",
            Scope::Game => "game",
            Scope::Group => "group",
            Scope::Parm => "parm",
            Scope::SelfEntity => "self",
            Scope::Owner => "owner",
        }
    }

    /// `local` bindings live and die with their thread.
    pub fn is_thread_scoped(&self) -> bool {
        matches!(self, Scope::Local)
    }

    /// Scopes whose variables belong to the script rather than to an entity
    /// or the engine. Only these take part in unused-variable checks.
    pub fn is_script_owned(&self) -> bool {
        matches!(self, Scope::Local | Scope::Level | Scope::Game)
    }
}

/// How the engine treats a thread by virtue of its name alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ThreadRole {
    #[default]
    Plain,
    EntryPoint,
    EngineCallback,
}

impl ThreadRole {
    pub fn of(name: &str) -> ThreadRole {
        let lower = name.to_ascii_lowercase();
        if ENTRY_POINTS.contains(lower.as_str()) {
            ThreadRole::EntryPoint
        } else if ENGINE_CALLBACKS.contains(lower.as_str()) {
            ThreadRole::EngineCallback
        } else {
            ThreadRole::Plain
        }
    }

    pub fn is_engine_invoked(&self) -> bool {
        !matches!(self, ThreadRole::Plain)
    }
}

static KEYWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "if", "else", "while", "for", "do", "switch", "case", "default", "break", "continue",
        "end", "goto", "thread", "waitthread", "exec", "waitexec", "try", "catch", "throw",
        "nil", "null", "true", "false", "makearray", "endarray",
    ]
    .into_iter()
    .collect()
});

static ENTRY_POINTS: Lazy<HashSet<&'static str>> =
    Lazy::new(|| ["main", "start", "init", "setup", "spawn"].into_iter().collect());

static ENGINE_CALLBACKS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "pain", "death", "killed", "damage", "touch", "use", "activate", "trigger", "idle",
        "attack", "think", "blocked", "anim_done", "respawn", "connected", "disconnected",
        "intermission", "gameover",
    ]
    .into_iter()
    .collect()
});

// Engine functions that are called with parenthesized arguments or as bare
// commands. Not exhaustive; the documentation database is the authority.
static BUILTINS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        // flow and timing
        "wait", "waitframe", "waittill", "delaythrow", "pause", "commanddelay",
        // printing
        "print", "println", "dprintln", "iprintln", "iprintlnbold", "iprintln_noloc",
        "iprintlnbold_noloc", "centerprint", "locprint", "conprintf", "error",
        // conversions and math
        "int", "float", "string", "abs", "sin", "cos", "tan", "atan", "sqrt", "pow",
        "randomint", "randomfloat", "vector_length", "vector_normalize", "vector_dot",
        "vector_cross", "vector_scale", "vector_add", "vector_subtract", "vector_within",
        "vector_toangles", "angles_toforward", "angles_toleft", "angles_toup",
        "angles_pointat", "typeof", "isalive", "isarray", "isdefined", "size",
        // cvars and level state
        "getcvar", "setcvar", "getdate", "gettime", "gettimezone", "spawn", "delete",
        "remove", "trigger", "settargetname", "targetname", "gettagposition",
        "gettagangles", "getentbyentnum", "self_entity",
        // entity commands
        "hide", "show", "solid", "notsolid", "bind", "unbind", "glue", "unglue",
        "playsound", "loopsound", "stoploopsound", "stopsound", "moveto", "movedir",
        "moveup", "movedown", "rotatex", "rotatey", "rotatez", "rotatexup",
        "rotateyup", "rotatezup", "setsize", "setthread", "setorigin", "setangles",
        "anim", "playanim", "damage", "kill", "health", "model", "scale", "origin",
        "angles", "time", "speed", "light", "lightoff", "lighton", "physics_on",
        "physics_off", "stopwatch", "cansee", "canseenoents", "getcontrollerangles",
        "disconnect", "stufftext", "teleport", "giveweapon", "takeall", "useweapon",
        "drawhud", "earthquake", "fadeout", "fadein", "cinematic", "nocinematic",
        "huddraw_shader", "huddraw_align", "huddraw_rect", "huddraw_virtualsize",
        "huddraw_color", "huddraw_alpha", "huddraw_string", "huddraw_font",
        "music", "soundtrack", "forcemusic", "exploder", "missionfailed",
        "addobjective", "setcurrentobjective", "team_win", "teamwin", "visible",
        "letterbox", "noletterbox", "freezeplayer", "releaseplayer",
    ]
    .into_iter()
    .collect()
});

pub fn is_keyword(word: &str) -> bool {
    KEYWORDS.contains(word.to_ascii_lowercase().as_str())
}

pub fn is_builtin(word: &str) -> bool {
    BUILTINS.contains(word.to_ascii_lowercase().as_str())
}

pub fn is_scope(word: &str) -> bool {
    Scope::parse(word).is_some()
}

pub fn is_identifier_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

pub fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Characters that may appear in a script path such as `global/spawner.scr`.
pub fn is_path_char(c: char) -> bool {
    is_identifier_char(c) || matches!(c, '/' | '\\' | '.' | '-')
}

/// Statements after which control never falls through to the next line.
pub fn is_flow_terminator(word: &str) -> bool {
    matches!(
        word.to_ascii_lowercase().as_str(),
        "end" | "goto" | "break" | "continue"
    )
}

/// Keywords that may take a braceless body on the following line.
pub fn is_control_header(word: &str) -> bool {
    matches!(
        word.to_ascii_lowercase().as_str(),
        "if" | "else" | "while" | "for"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_lookup_is_case_insensitive() {
        assert_eq!(Scope::parse("LOCAL"), Some(Scope::Local));
        assert_eq!(Scope::parse("Self"), Some(Scope::SelfEntity));
        assert_eq!(Scope::parse("locals"), None);
    }

    #[test]
    fn thread_roles() {
        assert_eq!(ThreadRole::of("main"), ThreadRole::EntryPoint);
        assert_eq!(ThreadRole::of("Pain"), ThreadRole::EngineCallback);
        assert_eq!(ThreadRole::of("helper"), ThreadRole::Plain);
        assert!(!ThreadRole::of("helper").is_engine_invoked());
    }

    #[test]
    fn keywords_and_builtins_are_disjoint_enough() {
        assert!(is_keyword("goto"));
        assert!(is_keyword("WaitThread"));
        assert!(!is_builtin("goto"));
        assert!(is_builtin("randomint"));
        assert!(is_builtin("IPrintLnBold"));
    }

    #[test]
    fn only_script_scopes_are_owned() {
        assert!(Scope::Local.is_script_owned());
        assert!(Scope::Game.is_script_owned());
        assert!(!Scope::SelfEntity.is_script_owned());
        assert!(Scope::Local.is_thread_scoped());
        assert!(!Scope::Level.is_thread_scoped());
    }
}
