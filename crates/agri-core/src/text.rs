//! Text normalization for addresses and labels.

/// Collapse whitespace runs and fold French diacritics to plain ASCII letters.
///
/// Non-ASCII characters outside the folding table are kept as they are.
pub fn normalize_text(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for word in input.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
        }
        for ch in word.chars() {
            match fold_char(ch) {
                Some(folded) => out.push_str(folded),
                None => out.push(ch),
            }
        }
    }
    out.trim().to_string()
}

/// Lowercased, folded form used for case-insensitive comparisons.
pub fn fold_key(input: &str) -> String {
    normalize_text(input).to_ascii_lowercase()
}

fn fold_char(ch: char) -> Option<&'static str> {
    let folded = match ch {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' => "a",
        'À' | 'Á' | 'Â' | 'Ã' | 'Ä' | 'Å' => "A",
        'æ' => "ae",
        'Æ' => "AE",
        'ç' => "c",
        'Ç' => "C",
        'è' | 'é' | 'ê' | 'ë' => "e",
        'È' | 'É' | 'Ê' | 'Ë' => "E",
        'ì' | 'í' | 'î' | 'ï' => "i",
        'Ì' | 'Í' | 'Î' | 'Ï' => "I",
        'ñ' => "n",
        'Ñ' => "N",
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' => "o",
        'Ò' | 'Ó' | 'Ô' | 'Õ' | 'Ö' => "O",
        'œ' => "oe",
        'Œ' => "OE",
        'ù' | 'ú' | 'û' | 'ü' => "u",
        'Ù' | 'Ú' | 'Û' | 'Ü' => "U",
        'ý' | 'ÿ' => "y",
        'Ý' | 'Ÿ' => "Y",
        '’' | '‘' => "'",
        '–' | '—' => "-",
        _ => return None,
    };
    Some(folded)
}
