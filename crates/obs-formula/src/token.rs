/// Fixed, injective substitution used to encode the punctuation a node
/// name may carry (`[`, `]`, `=`, `;`, `/`) into identifier-safe text
/// before handing the formula to the arithmetic expression parser, and
/// to reverse it afterward (spec §4.7, §9).
///
/// The generic parser only understands `[A-Za-z0-9_]+` as an identifier;
/// everything else is an operator or delimiter to it. Each code below is
/// chosen so that none is a substring of another, which makes the
/// substitution reversible by plain string replacement in either order.
const ESCAPES: &[(char, &str)] =
    &[('[', "_LB_"), (']', "_RB_"), ('=', "_EQ_"), (';', "_SC_"), ('/', "_SL_")];

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match ESCAPES.iter().find(|(ch, _)| *ch == c) {
            Some((_, code)) => out.push_str(code),
            None => out.push(c),
        }
    }
    out
}

fn unescape(token: &str) -> String {
    let mut out = token.to_owned();
    for (c, code) in ESCAPES {
        out = out.replace(code, &c.to_string());
    }
    out
}

/// Rewrites `formula` so every node-name span (an identifier run,
/// optionally followed by a `[...]` filter block) becomes one
/// `[A-Za-z0-9_]+` token, leaving whitespace, parentheses, and the `+ -
/// * /` operators untouched.
pub fn encode_formula(formula: &str) -> String {
    let chars: Vec<char> = formula.chars().collect();
    let mut out = String::with_capacity(formula.len());
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c.is_alphanumeric() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            if i < chars.len() && chars[i] == '[' {
                i += 1;
                while i < chars.len() && chars[i] != ']' {
                    i += 1;
                }
                if i < chars.len() {
                    i += 1; // consume the closing ']'
                }
            }
            let raw: String = chars[start..i].iter().collect();
            out.push_str(&escape(&raw));
        } else {
            out.push(c);
            i += 1;
        }
    }
    out
}

/// Reverses [`encode_formula`] on one already-isolated node token (an
/// `Ident` leaf returned by the parser), recovering the original
/// `VariableId` or `VariableId[k1=v1;...]` text.
pub fn decode_node_token(token: &str) -> String {
    unescape(token)
}
