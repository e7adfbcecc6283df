pub(crate) const WHITESPACE: u8 = 1;
pub(crate) const BOUNDARY: u8 = 2;
pub(crate) const WORD_START: u8 = 4;
pub(crate) const NUMBER_START: u8 = 8;
pub(crate) const OPERATOR: u8 = 16;

#[inline]
pub(crate) fn class(b: u8) -> u8 {
    CHARACTER_CLASS[usize::from(b)]
}

#[inline]
pub(crate) fn is_whitespace(b: u8) -> bool {
    class(b) & WHITESPACE != 0
}

/// Bytes that terminate an unquoted word or number
#[inline]
pub(crate) fn is_boundary(b: u8) -> bool {
    class(b) & BOUNDARY != 0
}

#[inline]
pub(crate) fn is_word_start(b: u8) -> bool {
    class(b) & WORD_START != 0
}

#[inline]
pub(crate) fn is_number_start(b: u8) -> bool {
    class(b) & NUMBER_START != 0
}

#[inline]
pub(crate) fn is_operator(b: u8) -> bool {
    class(b) & OPERATOR != 0
}

const fn create_character_class_table() -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut i = 0usize;
    while i <= 32 {
        table[i] = WHITESPACE | BOUNDARY;
        i += 1;
    }

    table[b'!' as usize] = BOUNDARY | OPERATOR;
    table[b'<' as usize] = BOUNDARY | OPERATOR;
    table[b'=' as usize] = BOUNDARY | OPERATOR;
    table[b'>' as usize] = BOUNDARY | OPERATOR;
    table[b'}' as usize] = BOUNDARY;

    let mut c = b'a';
    while c <= b'z' {
        table[c as usize] = WORD_START;
        table[(c - 32) as usize] = WORD_START;
        c += 1;
    }
    table[b'@' as usize] = WORD_START;
    table[b'_' as usize] = WORD_START;

    let mut d = b'0';
    while d <= b'9' {
        table[d as usize] = NUMBER_START;
        d += 1;
    }
    table[b'-' as usize] = NUMBER_START;
    table[b'+' as usize] = NUMBER_START;
    table[b'.' as usize] = NUMBER_START;
    table
}

/// This table encodes every attribute of a byte the tokenizer cares about in
/// a single lookup.
static CHARACTER_CLASS: [u8; 256] = create_character_class_table();
