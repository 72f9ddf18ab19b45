//! Final argument list: defaults, then job arguments, then the target.

/// Builds `<defaults...> <job_args...> <target>`. If the job sets its own
/// output (`-o`, `--output`, `--output=...`), the default output flag and its
/// value are dropped.
pub fn compose_args(defaults: &[String], job_args: &[String], target: &str) -> Vec<String> {
    let user_output = job_args.iter().any(|a| is_output_flag(a));
    let mut args = Vec::with_capacity(defaults.len() + job_args.len() + 1);
    let mut iter = defaults.iter();
    while let Some(arg) = iter.next() {
        if user_output && is_output_flag(arg) {
            if !arg.contains('=') {
                iter.next();
            }
            continue;
        }
        args.push(arg.clone());
    }
    args.extend(job_args.iter().cloned());
    args.push(target.to_string());
    args
}

fn is_output_flag(arg: &str) -> bool {
    arg == "-o" || arg == "--output" || arg.starts_with("--output=")
}
