//! CLI parsing tests for show command.

#[cfg(test)]
mod tests {
    use crate::cli::Args;
    use clap::Parser;
    use rstest::rstest;

    crate::cli_required_arg_test! {
        command: "show",
        test_name: test_requires_model,
        required_arg: "--model",
    }

    crate::cli_defaults_test! {
        command: "show",
        variant: Show,
        required_args: ["-m", "dm-1"],
        defaults: {
            sdl: false,
        },
    }

    crate::cli_option_test_with_required! {
        command: "show",
        variant: Show,
        required_args: ["-m", "dm-1"],
        test_name: test_with_sdl,
        args: ["--sdl"],
        field: sdl,
        expected: true,
    }
}
