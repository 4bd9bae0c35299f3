use vergen_gitcl::{Emitter, Gitcl};

// Only the git facts end up in `triad --version` and the triadd startup line.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    let git = Gitcl::builder()
        .branch(true)
        .sha(true)
        .dirty(true)
        .build();
    Emitter::default().add_instructions(&git)?.emit()?;
    Ok(())
}
