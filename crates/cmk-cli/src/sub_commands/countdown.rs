use anyhow::Result;
use cmk::MintController;

pub async fn countdown(controller: &MintController) -> Result<()> {
    controller.start().await;

    match controller.countdown() {
        Some(countdown) => println!("{countdown}"),
        None => println!("Minting is open"),
    }

    Ok(())
}
