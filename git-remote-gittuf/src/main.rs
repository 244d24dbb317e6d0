use std::process::ExitCode;

use git_remote_gittuf::rsl::GittufCli;
use git_remote_gittuf::{git, helper, Error};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 3 {
        let name = args.first().map(String::as_str).unwrap_or("git-remote-gittuf");
        eprintln!("usage: {name} <remote-name> <url>");
        return ExitCode::FAILURE;
    }

    // Diagnostics go to stderr; stdout belongs to the protocol.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    match run(&args[1], &args[2]) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("fatal: {err}");
            // Mirror the backing helper's exit code when it is what failed.
            if let Error::ChildExit { status, .. } = &err {
                if let Some(code) = status.code() {
                    return ExitCode::from(code.clamp(1, 255) as u8);
                }
            }
            ExitCode::FAILURE
        }
    }
}

fn run(remote: &str, url: &str) -> Result<(), Error> {
    let outcome = if url.starts_with("https://") || url.starts_with("http://") {
        let mut recorder = GittufCli::new();
        helper::run_http(remote, url, &mut recorder)?
    } else {
        return Err(Error::UnsupportedTransport { url: url.to_owned() });
    };

    // Git only updates the refs it asked for; anchor the fetched gittuf tips
    // locally so the transported RSL objects stay reachable.
    if !outcome.is_push {
        git::update_local_refs(&outcome.gittuf_refs)?;
    }
    Ok(())
}
