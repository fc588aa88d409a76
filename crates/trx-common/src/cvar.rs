// cvar.rs — Engine configuration variables

use bitflags::bitflags;
use std::collections::HashMap;

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct CvarFlags: u32 {
        /// Written back by `write_archive`.
        const ARCHIVE  = 0x01;
        /// Only settable while cheats are allowed.
        const CHEAT    = 0x02;
        /// Write protected; only `force_set` changes it.
        const NOSET    = 0x04;
        /// Changes wait for the next level load.
        const LATCH    = 0x08;
        const USERINFO = 0x10;
    }
}

/// A configuration variable.
#[derive(Clone, Debug)]
pub struct Cvar {
    pub name: String,
    pub string: String,
    pub latched_string: Option<String>,
    pub flags: CvarFlags,
    pub modified: bool,
    pub value: f32,
}

/// Variable registry with O(1) lookup by name.
pub struct CvarContext {
    pub cvar_vars: Vec<Cvar>,
    cvar_index: HashMap<String, usize>,
    pub cheats_allowed: bool,
}

impl Default for CvarContext {
    fn default() -> Self {
        Self::new()
    }
}

impl CvarContext {
    pub fn new() -> Self {
        Self { cvar_vars: Vec::new(), cvar_index: HashMap::new(), cheats_allowed: false }
    }

    /// Registry with the simulation's variables registered at their defaults.
    pub fn with_engine_defaults() -> Self {
        let mut ctx = Self::new();
        ctx.get("developer", Some("0"), CvarFlags::empty());
        ctx.get("g_god", Some("0"), CvarFlags::CHEAT);
        ctx.get("g_cheatdive", Some("0"), CvarFlags::CHEAT);
        ctx.get("s_musicvolume", Some("0.8"), CvarFlags::ARCHIVE);
        ctx.get("s_sfxvolume", Some("0.8"), CvarFlags::ARCHIVE);
        ctx.get("save_compress", Some("1"), CvarFlags::ARCHIVE);
        ctx.get("cl_fixedframes", Some("1"), CvarFlags::empty());
        ctx
    }

    pub fn find_var_index(&self, name: &str) -> Option<usize> {
        self.cvar_index.get(name).copied()
    }

    pub fn find_var(&self, name: &str) -> Option<&Cvar> {
        self.cvar_index.get(name).map(|&idx| &self.cvar_vars[idx])
    }

    /// Floating-point value, or 0 if the variable does not exist.
    pub fn variable_value(&self, name: &str) -> f32 {
        self.find_var(name).map_or(0.0, |v| v.value)
    }

    pub fn variable_string(&self, name: &str) -> &str {
        self.find_var(name).map_or("", |v| v.string.as_str())
    }

    /// Non-zero numeric value.
    pub fn is_set(&self, name: &str) -> bool {
        self.variable_value(name) != 0.0
    }

    /// Get or create a variable. An existing variable keeps its value and
    /// gains `flags`.
    pub fn get(&mut self, name: &str, value: Option<&str>, flags: CvarFlags) -> Option<usize> {
        if flags.contains(CvarFlags::USERINFO) && !Self::info_validate(name) {
            log::warn!("invalid info cvar name {:?}", name);
            return None;
        }

        if let Some(&idx) = self.cvar_index.get(name) {
            self.cvar_vars[idx].flags |= flags;
            return Some(idx);
        }

        let value = value?;
        let idx = self.cvar_vars.len();
        self.cvar_vars.push(Cvar {
            name: name.to_string(),
            string: value.to_string(),
            latched_string: None,
            flags,
            modified: true,
            value: value.parse::<f32>().unwrap_or(0.0),
        });
        self.cvar_index.insert(name.to_string(), idx);
        Some(idx)
    }

    fn info_validate(s: &str) -> bool {
        !s.contains('\\') && !s.contains('"') && !s.contains(';')
    }

    fn set2(&mut self, name: &str, value: &str, force: bool, level_running: bool) -> Option<usize> {
        let idx = match self.find_var_index(name) {
            Some(idx) => idx,
            None => return self.get(name, Some(value), CvarFlags::empty()),
        };
        let flags = self.cvar_vars[idx].flags;

        if !force {
            if flags.contains(CvarFlags::NOSET) {
                log::warn!("{} is write protected", name);
                return Some(idx);
            }
            if flags.contains(CvarFlags::CHEAT) && !self.cheats_allowed {
                log::warn!("{} is cheat protected", name);
                return Some(idx);
            }
            if flags.contains(CvarFlags::LATCH) && level_running {
                if self.cvar_vars[idx].latched_string.as_deref() != Some(value) && self.cvar_vars[idx].string != value {
                    log::info!("{} will be changed on the next level load", name);
                    self.cvar_vars[idx].latched_string = Some(value.to_string());
                }
                return Some(idx);
            }
        } else {
            self.cvar_vars[idx].latched_string = None;
        }

        let var = &mut self.cvar_vars[idx];
        if value == var.string {
            return Some(idx);
        }
        var.modified = true;
        var.string = value.to_string();
        var.value = value.parse::<f32>().unwrap_or(0.0);
        Some(idx)
    }

    /// Set a value, honouring `NOSET`, `CHEAT` and `LATCH`.
    pub fn set(&mut self, name: &str, value: &str) -> Option<usize> {
        self.set2(name, value, false, false)
    }

    /// Set while a level is loaded: latched variables are deferred.
    pub fn set_while_running(&mut self, name: &str, value: &str) -> Option<usize> {
        self.set2(name, value, false, true)
    }

    pub fn force_set(&mut self, name: &str, value: &str) -> Option<usize> {
        self.set2(name, value, true, false)
    }

    pub fn set_value(&mut self, name: &str, value: f32) {
        let val_str = if value == (value as i32) as f32 { format!("{}", value as i32) } else { format!("{}", value) };
        self.set(name, &val_str);
    }

    /// Apply deferred changes of latched variables.
    pub fn get_latched_vars(&mut self) {
        for var in &mut self.cvar_vars {
            if let Some(latched) = var.latched_string.take() {
                var.value = latched.parse::<f32>().unwrap_or(0.0);
                var.string = latched;
                var.modified = true;
            }
        }
    }

    /// Executes `set`/`seta` lines. `seta` also marks the variable archived.
    /// Blank lines and `//` comments are skipped; other lines are reported
    /// and ignored.
    pub fn exec_config(&mut self, text: &str) {
        for (lineno, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with("//") {
                continue;
            }
            let mut parts = line.splitn(3, char::is_whitespace);
            let cmd = parts.next().unwrap_or("");
            let (Some(name), Some(value)) = (parts.next(), parts.next()) else {
                log::warn!("config line {}: expected `{} <name> <value>`", lineno + 1, cmd);
                continue;
            };
            let value = value.trim().trim_matches('"');
            match cmd {
                "set" => {
                    self.set(name, value);
                }
                "seta" => {
                    self.set(name, value);
                    self.get(name, None, CvarFlags::ARCHIVE);
                }
                other => log::warn!("config line {}: unknown command {:?}", lineno + 1, other),
            }
        }
    }

    /// Renders archived variables as `seta` lines.
    pub fn write_archive(&self, writer: &mut dyn std::io::Write) -> std::io::Result<()> {
        for var in self.cvar_vars.iter().filter(|v| v.flags.contains(CvarFlags::ARCHIVE)) {
            writeln!(writer, "seta {} \"{}\"", var.name, var.string)?;
        }
        Ok(())
    }
}

// ============================================================
// Tests
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cvar_get_and_find() {
        let mut ctx = CvarContext::new();
        ctx.get("test_var", Some("42"), CvarFlags::empty());
        assert_eq!(ctx.variable_value("test_var"), 42.0);
        assert_eq!(ctx.variable_string("test_var"), "42");
    }

    #[test]
    fn test_cvar_get_creates_once() {
        let mut ctx = CvarContext::new();
        ctx.get("test", Some("1"), CvarFlags::empty());
        ctx.get("test", Some("2"), CvarFlags::ARCHIVE);
        assert_eq!(ctx.variable_string("test"), "1");
        assert!(ctx.find_var("test").unwrap().flags.contains(CvarFlags::ARCHIVE));
    }

    #[test]
    fn test_cvar_noset() {
        let mut ctx = CvarContext::new();
        ctx.get("test_var", Some("10"), CvarFlags::NOSET);
        ctx.set("test_var", "20");
        assert_eq!(ctx.variable_value("test_var"), 10.0);
        ctx.force_set("test_var", "20");
        assert_eq!(ctx.variable_value("test_var"), 20.0);
    }

    #[test]
    fn test_cvar_cheat_protected() {
        let mut ctx = CvarContext::with_engine_defaults();
        ctx.set("g_god", "1");
        assert!(!ctx.is_set("g_god"));
        ctx.cheats_allowed = true;
        ctx.set("g_god", "1");
        assert!(ctx.is_set("g_god"));
    }

    #[test]
    fn test_cvar_latch() {
        let mut ctx = CvarContext::new();
        ctx.get("level_seed", Some("1"), CvarFlags::LATCH);
        ctx.set_while_running("level_seed", "7");
        assert_eq!(ctx.variable_string("level_seed"), "1");
        ctx.get_latched_vars();
        assert_eq!(ctx.variable_value("level_seed"), 7.0);
    }

    #[test]
    fn test_cvar_set_value() {
        let mut ctx = CvarContext::new();
        ctx.set_value("vol", 0.5);
        assert_eq!(ctx.variable_string("vol"), "0.5");
        ctx.set_value("vol", 2.0);
        assert_eq!(ctx.variable_string("vol"), "2");
    }

    #[test]
    fn test_exec_config_and_archive() {
        let mut ctx = CvarContext::with_engine_defaults();
        ctx.exec_config("// volumes\nseta s_musicvolume 0.25\nset developer 1\nbogus\nseta my_var \"hello\"\n");
        assert_eq!(ctx.variable_value("s_musicvolume"), 0.25);
        assert!(ctx.is_set("developer"));

        let mut buf = Vec::new();
        ctx.write_archive(&mut buf).unwrap();
        let output = String::from_utf8(buf).unwrap();
        assert!(output.contains("seta s_musicvolume \"0.25\""));
        assert!(output.contains("seta my_var \"hello\""));
        assert!(!output.contains("developer"));
    }
}
