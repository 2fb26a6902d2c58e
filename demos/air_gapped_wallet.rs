use airgap_vault::chains::bitcoin::{BitcoinTransaction, TxInput};
use airgap_vault::chains::evm::{EvmFee, EvmTransaction};
use airgap_vault::chains::xrp::XrpPayment;
use airgap_vault::{MnemonicStrength, NetworkRegistry, UnsignedTransaction, WalletEngine};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    println!("Air-Gapped Wallet Demo");
    println!("======================");

    let engine = WalletEngine::new();
    let registry = NetworkRegistry::new();

    let mnemonic = engine.generate_mnemonic(MnemonicStrength::Words12)?;
    println!("\n⚠️  IMPORTANT: Write down your mnemonic phrase and store it securely!");
    println!("Mnemonic: {}\n", mnemonic.phrase().as_str());

    let passphrase = ""; // Optional BIP39 passphrase
    let seed = mnemonic.to_seed(passphrase);

    println!("Derived Accounts:");
    let accounts = engine.derive_accounts(&registry, &seed, 0)?;
    for account in &accounts {
        println!("\n{} ({})", account.network_key, account.derivation_path);
        println!("Address:     {}", account.address);
        println!("Public Key:  {}", account.public_key);
    }

    for network in registry.list() {
        println!(
            "\n{} account xpub: {}",
            network.key,
            engine.export_account_xpub(network, &seed)?
        );
    }

    println!("\nSigned Transactions:");
    for account in &accounts {
        let network = registry
            .get(&account.network_key)
            .ok_or("account network missing from registry")?;

        let tx: UnsignedTransaction = match account.network_key.as_str() {
            "ETH" | "XDC" => EvmTransaction {
                nonce: 0,
                to: "0xb922645E90e9fCAea54029be2434EA10eE9Ef47e".parse()?,
                value: 1_000_000_000_000_000,
                gas_limit: 21_000,
                fee: EvmFee::Eip1559 {
                    max_fee_per_gas: 30_000_000_000,
                    max_priority_fee_per_gas: 2_000_000_000,
                },
                chain_id: network.chain_id.unwrap_or_default(),
                data: Vec::new(),
            }
            .into(),
            "BTC" => {
                let input = TxInput::new(
                    "3b7c58a9f1d2e3c4b5a6978877665544332211ffeeddccbbaa99887766554433",
                    1,
                    100_000,
                    &account.address,
                )?;
                BitcoinTransaction::payment(
                    input,
                    "bc1qnjg0jd8228aq7egyzacy8cys3knf9xvrerkf9g",
                    60_000,
                    1_000,
                    None,
                )?
                .into()
            }
            "XRP" => XrpPayment::new(
                account.address.clone(),
                "rHb9CJAWyB4rj91VRWn96DkukG4bwdtyTh",
                1_000_000,
                1,
                12,
            )
            .into(),
            _ => continue,
        };

        let signed = engine.sign_with_seed(network, &seed, account.index, &tx)?;
        println!("\n{} tx hash: {}", account.network_key, signed.hash_hex());
        println!("Raw:        {}", signed.hex());
    }

    println!("\nWallet operations completed successfully!");
    Ok(())
}
