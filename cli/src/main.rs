mod logger;

use std::path::PathBuf;
use std::process;

use clap::Parser;
use colored::*;

use verbprobe_core::ProbeConfig;

#[derive(Parser, Debug)]
#[command(
    name = "verbprobe",
    version,
    about = "HTTP Methods Tester",
    long_about = "VerbProbe tests HTTP methods against URLs. It can be used to find HTTP verb \
                  tampering vulnerabilities and \"dangerous\" HTTP methods.",
    after_help = "\x1b[1;36mEXAMPLES:\x1b[0m
  Quick probe:                    verbprobe -u http://target.com
  Safe methods only:              verbprobe -u http://target.com -s
  Through Burp, ignore TLS:       verbprobe -u https://target.com -k -p http://127.0.0.1:8080
  Custom methods + JSON output:   verbprobe -u target.com -m methods.txt -o results.json
  Headers and cookies:            verbprobe -u target.com -H \"Authorization: Bearer TOKEN\" -b \"sess=abc\"
  Many targets:                   verbprobe -i urls.txt -n 10 -q -o results.json"
)]
pub struct Args {
    #[arg(short = 'u', long, required_unless_present = "input", conflicts_with = "input",
        help = "Target URL (e.g., example.com:port/path)")]
    pub url: Option<String>,

    #[arg(short = 'i', long, help = "Read target URLs from a file (one per line)")]
    pub input: Option<PathBuf>,

    #[arg(short = 'k', long, default_value_t = false, help = "Allow insecure server connections (skip SSL verification)")]
    pub insecure: bool,

    #[arg(short = 'f', long, default_value_t = false, help = "Follow redirects")]
    pub follow: bool,

    #[arg(short = 'p', long, help = "Use proxy for connections (e.g., http://localhost:8080)")]
    pub proxy: Option<String>,

    #[arg(short = 'n', long, default_value_t = 5, help = "Number of concurrent requests")]
    pub concurrent: usize,

    #[arg(short = 't', long, default_value_t = 10, help = "Timeout in seconds for HTTP requests")]
    pub timeout: u64,

    #[arg(short = 'H', long = "header",
        help = "Headers to include (e.g., -H \"User-Agent: test\" or -H headers.txt)")]
    pub headers: Vec<String>,

    #[arg(short = 'b', long, help = "Cookies to use (e.g., -b \"session=abc\" or -b cookies.txt)")]
    pub cookies: Option<String>,

    #[arg(short = 'A', long = "user-agent", help = "User-Agent string to send")]
    pub user_agent: Option<String>,

    #[arg(short = 's', long = "safe-only", default_value_t = false,
        help = "Only test safe methods (exclude PUT, DELETE, etc.)")]
    pub safe_only: bool,

    #[arg(short = 'm', long = "methods", help = "Custom HTTP methods wordlist file")]
    pub methods: Option<PathBuf>,

    #[arg(short = 'v', long, default_value_t = false, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(short = 'q', long, default_value_t = false, help = "Show no information at all")]
    pub quiet: bool,

    #[arg(short = 'o', long, help = "Save results to specified JSON file")]
    pub output: Option<PathBuf>,
}

impl Args {
    fn into_config(self) -> ProbeConfig {
        ProbeConfig {
            url: self.url.unwrap_or_default(),
            input_file: self.input,
            concurrency: self.concurrent,
            timeout: self.timeout,
            insecure: self.insecure,
            follow_redirects: self.follow,
            proxy: self.proxy,
            headers: self.headers,
            cookies: self.cookies,
            user_agent: self.user_agent,
            safe_only: self.safe_only,
            wordlist: self.methods,
            output: self.output,
            verbose: self.verbose,
            quiet: self.quiet,
        }
    }
}

#[tokio::main]
async fn main() {
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    let args = Args::parse();
    logger::init(args.verbose, args.quiet);

    if !args.quiet {
        print_banner();
    }

    if let Err(e) = verbprobe_core::run(&args.into_config()).await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn print_banner() {
    println!(
        "{}",
        format!("[~] VerbProbe - HTTP Methods Tester v{}", env!("CARGO_PKG_VERSION"))
            .bright_cyan()
            .bold()
    );
}
