use std::path::PathBuf;

use ori_text::logging::{FileLogger, log_path};
use ori_text::{Canvas, Config, FontRegistry};

const USAGE: &str = "\
USAGE:
    oritext [OPTIONS] TEXT

OPTIONS:
    --config FILE       Read configuration from FILE
    --out FILE          Write the rendered text as a binary PGM image
    --max-width N       Clip the text to N pixels
    --stats             Print cache diagnostics after rendering
    --print-config      Print the default configuration to stdout
    --version, -V       Print version information
    --help, -h          Print this help message";

#[derive(Debug, Default)]
struct Options {
    config: Option<PathBuf>,
    out: Option<PathBuf>,
    max_width: Option<i32>,
    stats: bool,
    text: Option<String>,
}

fn parse_args(args: &[String]) -> Result<Options, String> {
    let mut opts = Options::default();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => opts.config = Some(value(&mut iter, arg)?.into()),
            "--out" => opts.out = Some(value(&mut iter, arg)?.into()),
            "--max-width" => {
                let raw = value(&mut iter, arg)?;
                let n = raw
                    .parse()
                    .map_err(|e| format!("invalid --max-width {raw:?}: {e}"))?;
                opts.max_width = Some(n);
            }
            "--stats" => opts.stats = true,
            flag if flag.starts_with("--") => return Err(format!("unknown option {flag}")),
            text => {
                if opts.text.replace(text.to_owned()).is_some() {
                    return Err("expected a single TEXT argument".to_owned());
                }
            }
        }
    }
    Ok(opts)
}

fn value<'a>(iter: &mut impl Iterator<Item = &'a String>, flag: &str) -> Result<&'a str, String> {
    iter.next()
        .map(String::as_str)
        .ok_or_else(|| format!("{flag} needs a value"))
}

fn run(opts: Options) -> Result<(), String> {
    let text = opts.text.ok_or("missing TEXT argument")?;
    let config = match &opts.config {
        Some(path) => Config::load_from(path).map_err(|e| e.to_string())?,
        None => Config::load(),
    };

    let level = config.log.level_filter().map_err(|e| e.to_string())?;
    if let Err(e) = FileLogger::new(log_path(), level).install() {
        eprintln!("warning: logging disabled: {e}");
    }

    let registry = FontRegistry::swash(&config.cache);
    let font = registry
        .acquire(&config.font.path, config.font.size, config.font.dpi)
        .map_err(|e| e.to_string())?;

    let fit = font.fit(&text, opts.max_width);
    let height = font.max_height().max(0) as usize;
    let mut canvas = Canvas::new(fit.width.max(0) as usize, height);
    let drawn = font
        .render(&mut canvas, 0, 0, &text, opts.max_width, None)
        .map_err(|e| e.to_string())?;
    println!(
        "width={} height={} glyphs={drawn}",
        canvas.width(),
        canvas.height()
    );

    if let Some(out) = &opts.out {
        std::fs::write(out, canvas.to_pgm())
            .map_err(|e| format!("failed to write {}: {e}", out.display()))?;
    }
    if opts.stats {
        println!("{}", registry.stats());
    }
    Ok(())
}

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();

    if args.iter().any(|a| a == "--print-config") {
        match Config::default().to_toml() {
            Ok(s) => print!("{s}"),
            Err(e) => {
                eprintln!("error: {e}");
                std::process::exit(1);
            }
        }
        return;
    }

    if args.iter().any(|a| a == "--version" || a == "-V") {
        println!("oritext {}", env!("CARGO_PKG_VERSION"));
        return;
    }

    if args.iter().any(|a| a == "--help" || a == "-h") {
        println!("oritext {}", env!("CARGO_PKG_VERSION"));
        println!("Render text through cached glyph and string caches\n");
        println!("{USAGE}");
        return;
    }

    let result = parse_args(&args).and_then(run);
    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
