use clap::Parser;

/// Arguments for completions command
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:\n  \
                  Generate PowerShell completions:\n    triquetra completions powershell >> $PROFILE\n\n\
                  Generate bash completions:\n    triquetra completions bash > ~/.bash_completion.d/triquetra\n\n\
                  Generate zsh completions:\n    triquetra completions zsh > ~/.zfunc/_triquetra")]
pub struct CompletionsArgs {
    /// Shell type (bash, elvish, fish, powershell, zsh)
    pub shell: String,
}
