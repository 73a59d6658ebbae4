//! Code 128 encoder and SVG renderer for printable pack labels.

use crate::error::AppError;

/// Bar/space widths of every symbol value, in modules. Index 106 is the stop
/// pattern including its termination bar.
const PATTERNS: [&str; 107] = [
    "212222", "222122", "222221", "121223", "121322", "131222", "122213", "122312", "132212",
    "221213", "221312", "231212", "112232", "122132", "122231", "113222", "123122", "123221",
    "223211", "221132", "221231", "213212", "223112", "312131", "311222", "321122", "321221",
    "312212", "322112", "322211", "212123", "212321", "232121", "111323", "131123", "131321",
    "112313", "132113", "132311", "211313", "231113", "231311", "112133", "112331", "132131",
    "113123", "113321", "133121", "313121", "211331", "231131", "213113", "213311", "213131",
    "311123", "311321", "331121", "312113", "312311", "332111", "314111", "221411", "431111",
    "111224", "111422", "121124", "121421", "141122", "141221", "112214", "112412", "122114",
    "122411", "142112", "142211", "241211", "221114", "413111", "241112", "134111", "111242",
    "121142", "121241", "114212", "124112", "124211", "411212", "421112", "421211", "212141",
    "214121", "412121", "111143", "111341", "131141", "114113", "114311", "411113", "411311",
    "113141", "114131", "311141", "411131", "211412", "211214", "211232", "2331112",
];

const START_B: u8 = 104;
const START_C: u8 = 105;
const CODE_C: u8 = 99;
const CODE_B: u8 = 100;
const STOP: usize = 106;

/// Blank modules on each side of the symbol.
pub const QUIET_ZONE: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CodeSet {
    B,
    C,
}

/// Number of consecutive ASCII digits starting at `from`.
fn digit_run(bytes: &[u8], from: usize) -> usize {
    bytes[from..].iter().take_while(|b| b.is_ascii_digit()).count()
}

fn pair_value(bytes: &[u8], at: usize) -> u8 {
    (bytes[at] - b'0') * 10 + (bytes[at + 1] - b'0')
}

/// Encodes `data` into symbol values: start code, data, checksum.
///
/// Runs of four or more digits are packed two per symbol in code set C; an
/// odd digit in front of such a run is sent in code set B.
pub fn encode(data: &str) -> Result<Vec<u8>, AppError> {
    if data.is_empty() {
        return Err(AppError::BadRequest("Barcode data is empty".into()));
    }
    if let Some(bad) = data.chars().find(|c| !(' '..='~').contains(c)) {
        return Err(AppError::BadRequest(format!(
            "Character {:?} cannot be encoded in Code 128",
            bad
        )));
    }

    let bytes = data.as_bytes();
    let all_digits = bytes.iter().all(u8::is_ascii_digit);

    let mut values = Vec::with_capacity(bytes.len() + 3);
    let mut set = if all_digits && bytes.len() >= 2 && bytes.len() % 2 == 0 {
        values.push(START_C);
        CodeSet::C
    } else if digit_run(bytes, 0) >= 4 && digit_run(bytes, 0) % 2 == 0 {
        values.push(START_C);
        CodeSet::C
    } else {
        values.push(START_B);
        CodeSet::B
    };

    let mut i = 0;
    while i < bytes.len() {
        let run = digit_run(bytes, i);
        match set {
            CodeSet::C if run >= 2 => {
                values.push(pair_value(bytes, i));
                i += 2;
            }
            CodeSet::C => {
                values.push(CODE_B);
                set = CodeSet::B;
            }
            CodeSet::B if run >= 4 => {
                if run % 2 == 1 {
                    values.push(bytes[i] - 32);
                    i += 1;
                }
                values.push(CODE_C);
                set = CodeSet::C;
            }
            CodeSet::B => {
                values.push(bytes[i] - 32);
                i += 1;
            }
        }
    }

    values.push(checksum(&values));
    Ok(values)
}

/// Start value plus the position-weighted sum of the data values, mod 103.
fn checksum(values: &[u8]) -> u8 {
    let sum = values
        .iter()
        .enumerate()
        .map(|(pos, &v)| {
            let weight = if pos == 0 { 1 } else { pos as u32 };
            weight * u32::from(v)
        })
        .sum::<u32>();
    (sum % 103) as u8
}

/// Alternating bar/space widths for the symbol values plus the stop pattern,
/// starting with a bar.
pub fn module_widths(values: &[u8]) -> Vec<u32> {
    values
        .iter()
        .map(|&v| PATTERNS[usize::from(v)])
        .chain(std::iter::once(PATTERNS[STOP]))
        .flat_map(|p| p.bytes().map(|b| u32::from(b - b'0')))
        .collect()
}

fn xml_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Renders `data` as an SVG barcode with the text printed underneath.
/// `module` is the width of the narrowest bar in user units.
pub fn render_svg(data: &str, module: f64) -> Result<String, AppError> {
    let widths = module_widths(&encode(data)?);
    let total_modules: u32 = widths.iter().sum::<u32>() + 2 * QUIET_ZONE;

    let bar_height = 60.0 * module;
    let font_size = 14.0 * module;
    let width = f64::from(total_modules) * module;
    let height = bar_height + font_size + 6.0 * module;

    let mut svg = format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\">\
         <rect width=\"{w}\" height=\"{h}\" fill=\"#fff\"/>",
        w = width,
        h = height
    );

    let mut x = QUIET_ZONE;
    for (i, &w) in widths.iter().enumerate() {
        if i % 2 == 0 {
            svg.push_str(&format!(
                "<rect x=\"{}\" y=\"0\" width=\"{}\" height=\"{}\" fill=\"#000\"/>",
                f64::from(x) * module,
                f64::from(w) * module,
                bar_height
            ));
        }
        x += w;
    }

    svg.push_str(&format!(
        "<text x=\"{}\" y=\"{}\" font-family=\"monospace\" font-size=\"{}\" text-anchor=\"middle\">{}</text></svg>",
        width / 2.0,
        bar_height + font_size + 2.0 * module,
        font_size,
        xml_escape(data)
    ));
    Ok(svg)
}
