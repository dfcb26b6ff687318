use anyhow::Result;
use cmk::MintController;

pub async fn status(controller: &MintController) -> Result<()> {
    controller.start().await;

    let display = controller.display();

    match controller.identity() {
        Some(identity) => println!("Wallet: {}", identity.shorten(4)),
        None => println!("Wallet: not connected"),
    }

    if display.balance.is_some() {
        println!("Balance: {:.2} SOL", display.balance_sol());
    }

    println!("Total Available: {}", display.items_available);
    println!("Redeemed: {}", display.items_redeemed);
    println!("Remaining: {}", display.items_remaining);

    if display.is_sold_out {
        println!("SOLD OUT");
    } else if let Some(countdown) = controller.countdown() {
        println!("Minting opens in {countdown}");
    } else if display.is_active {
        println!("Minting is open");
    }

    Ok(())
}
