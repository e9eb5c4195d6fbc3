//! X11 keysym and modifier-mask lookup tables.
//!
//! The named tables are compile-time `match`es covering the keys users
//! actually bind (function keys, locks, navigation, modifiers). Characters
//! outside the table fall back to their Latin-1 codepoint (the X11 rule for
//! printable characters) and `0x…` strings parse as raw keysym values, so
//! config files can always name a key one way or another.
//!
//! See `/usr/include/X11/keysymdef.h` for the full keysym list.

/// Scroll_Lock keysym, the default panic key.
pub const KEYSYM_SCROLL_LOCK: u32 = 0xFF14;

/// Pause keysym, the secondary default panic key.
pub const KEYSYM_PAUSE: u32 = 0xFF13;

/// Resolves a key name to an X11 keysym.
///
/// Resolution order: named table, single printable character (codepoint),
/// `0x…` hex literal. Returns `None` when nothing matches.
pub fn keysym_from_name(name: &str) -> Option<u32> {
    if let Some(keysym) = named_keysym(name) {
        return Some(keysym);
    }
    let mut chars = name.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        let code = c as u32;
        if (0x20..=0xFF).contains(&code) {
            return Some(code);
        }
    }
    if let Some(hex) = name.strip_prefix("0x").or_else(|| name.strip_prefix("0X")) {
        return u32::from_str_radix(hex, 16).ok();
    }
    None
}

fn named_keysym(name: &str) -> Option<u32> {
    let keysym = match name {
        // Function keys
        "F1" => 0xFFBE,
        "F2" => 0xFFBF,
        "F3" => 0xFFC0,
        "F4" => 0xFFC1,
        "F5" => 0xFFC2,
        "F6" => 0xFFC3,
        "F7" => 0xFFC4,
        "F8" => 0xFFC5,
        "F9" => 0xFFC6,
        "F10" => 0xFFC7,
        "F11" => 0xFFC8,
        "F12" => 0xFFC9,
        // Special keys
        "Scroll_Lock" => KEYSYM_SCROLL_LOCK,
        "Pause" | "Break" => KEYSYM_PAUSE,
        "Escape" | "Esc" => 0xFF1B,
        "Print" | "Print_Screen" => 0xFF61,
        "Insert" => 0xFF63,
        "Delete" => 0xFFFF,
        "Home" => 0xFF50,
        "End" => 0xFF57,
        "Page_Up" => 0xFF55,
        "Page_Down" => 0xFF56,
        "BackSpace" => 0xFF08,
        "Tab" => 0xFF09,
        "Return" | "Enter" => 0xFF0D,
        "space" | "Space" => 0x0020,
        // Punctuation names used in hotkey configs
        "slash" => 0x002F,
        "backslash" => 0x005C,
        "comma" => 0x002C,
        "period" => 0x002E,
        "semicolon" => 0x003B,
        "apostrophe" => 0x0027,
        "grave" => 0x0060,
        "minus" => 0x002D,
        "equal" => 0x003D,
        // Arrow keys
        "Left" => 0xFF51,
        "Up" => 0xFF52,
        "Right" => 0xFF53,
        "Down" => 0xFF54,
        // Modifier keys
        "Shift_L" => 0xFFE1,
        "Shift_R" => 0xFFE2,
        "Control_L" => 0xFFE3,
        "Control_R" => 0xFFE4,
        "Alt_L" => 0xFFE9,
        "Alt_R" => 0xFFEA,
        "Super_L" => 0xFFEB,
        "Super_R" => 0xFFEC,
        _ => return None,
    };
    Some(keysym)
}

/// X11 modifier mask for a modifier name, or `None` for unknown names.
pub fn modifier_mask_from_name(name: &str) -> Option<u32> {
    match name {
        "Shift" => Some(0x1),
        "Lock" => Some(0x2),
        "Ctrl" | "Control" => Some(0x4),
        "Alt" | "Mod1" => Some(0x8),
        "Mod2" => Some(0x10),
        "Mod3" => Some(0x20),
        "Mod4" | "Super" => Some(0x40),
        "Mod5" => Some(0x80),
        _ => None,
    }
}

/// Combined mask for a modifier list. Unknown names are skipped with a
/// warning so one typo does not disable the whole binding.
pub fn modifier_mask_from_names(names: &[String]) -> u32 {
    let mut mask = 0;
    for name in names {
        match modifier_mask_from_name(name) {
            Some(bit) => mask |= bit,
            None => tracing::warn!("unknown modifier {name:?} in key config"),
        }
    }
    mask
}

/// Standard pc105 X11 keycode for a digit key, used as a fallback when the
/// capturer cannot resolve keysyms. The digit row starts at keycode 10
/// ('1') and ends at 19 ('0').
pub fn fallback_keycode_for_digit(c: char) -> Option<u32> {
    match c {
        '1'..='9' => Some(9 + (c as u32 - '0' as u32)),
        '0' => Some(19),
        _ => None,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_keys_resolve() {
        assert_eq!(keysym_from_name("Scroll_Lock"), Some(0xFF14));
        assert_eq!(keysym_from_name("F5"), Some(0xFFC2));
        assert_eq!(keysym_from_name("slash"), Some(0x2F));
    }

    #[test]
    fn test_single_character_falls_back_to_codepoint() {
        assert_eq!(keysym_from_name("/"), Some(0x2F));
        assert_eq!(keysym_from_name("1"), Some(0x31));
        assert_eq!(keysym_from_name("a"), Some(0x61));
    }

    #[test]
    fn test_hex_literal_parses() {
        assert_eq!(keysym_from_name("0xff14"), Some(0xFF14));
        assert_eq!(keysym_from_name("0XFF13"), Some(0xFF13));
    }

    #[test]
    fn test_unknown_name_returns_none() {
        assert_eq!(keysym_from_name("Hyper_Mega_Key"), None);
        assert_eq!(keysym_from_name(""), None);
    }

    #[test]
    fn test_modifier_masks_combine() {
        let names = vec!["Ctrl".to_string(), "Shift".to_string()];
        assert_eq!(modifier_mask_from_names(&names), 0x5);
    }

    #[test]
    fn test_unknown_modifier_is_skipped() {
        let names = vec!["Ctrl".to_string(), "Turbo".to_string()];
        assert_eq!(modifier_mask_from_names(&names), 0x4);
    }

    #[test]
    fn test_digit_fallback_keycodes_follow_pc105_row() {
        assert_eq!(fallback_keycode_for_digit('1'), Some(10));
        assert_eq!(fallback_keycode_for_digit('9'), Some(18));
        assert_eq!(fallback_keycode_for_digit('0'), Some(19));
        assert_eq!(fallback_keycode_for_digit('x'), None);
    }
}
