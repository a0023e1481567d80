#![cfg(not(target_arch = "wasm32"))]
//! Provider dispatch and fill behavior against mocked node and device.

use ledger_provider::{
    device::{types::INS, DerivationType, MockDevice},
    types::{Address, Signature, TransactionParams, TxHash, TypedTransaction, U256, U64},
    JsonRpcClient, LedgerError, LedgerProvider, LedgerSigner, MockRpc, ProviderError,
};

const DEVICE_ADDRESS: &str = "2ed7afa17473e17ac59908f088b4371d28585476";

fn device_address() -> Address {
    DEVICE_ADDRESS.parse().unwrap()
}

fn provider(mock_device: &MockDevice, mock_rpc: &MockRpc) -> LedgerProvider<MockRpc, MockDevice> {
    let signer = LedgerSigner::new(mock_device.clone(), DerivationType::default()).unwrap();
    LedgerProvider::new(mock_rpc.clone(), signer)
}

fn script_address_query(mock: &MockDevice) {
    mock.push_app_configuration(0x01, (1, 10, 1));
    mock.push_address(&device_address());
}

fn tx_hash() -> TxHash {
    "0x88df016429689c079f3b2f6ad39fa052532c56795b733da78a91ebe6a713944b".parse().unwrap()
}

fn full_params() -> TransactionParams {
    TransactionParams {
        to: Some("abcabcabcabcabcabcabcabcabcabcabcabcabca".parse().unwrap()),
        value: Some(U256::zero()),
        gas_limit: Some(21000.into()),
        gas_price: Some(1_000_000_000u64.into()),
        nonce: Some(U256::zero()),
        chain_id: Some(1.into()),
        ..Default::default()
    }
}

#[tokio::test]
async fn eth_accounts_answers_with_the_checksummed_device_address() {
    let (device, rpc) = (MockDevice::new(), MockRpc::new());
    script_address_query(&device);

    let provider = provider(&device, &rpc);
    let accounts: Vec<String> = provider.request("eth_accounts", ()).await.unwrap();

    let checksummed = ledger_provider::utils::to_checksum(&device_address(), None);
    assert_eq!(accounts, vec![checksummed]);
    // nothing was forwarded to the node
    assert!(rpc.assert_request("eth_accounts", ()).is_err());
}

#[tokio::test]
async fn send_transaction_broadcasts_the_signed_encoding() {
    let (device, rpc) = (MockDevice::new(), MockRpc::new());
    device.push_app_configuration(0x01, (1, 10, 1));
    device.push_signature(0x25, [0x11; 32], [0x22; 32]);
    rpc.push(tx_hash()).unwrap();

    let provider = provider(&device, &rpc);
    let hash: TxHash = provider.request("eth_sendTransaction", [full_params()]).await.unwrap();
    assert_eq!(hash, tx_hash());

    let expected_raw = TypedTransaction::try_from(full_params())
        .unwrap()
        .rlp_signed(&Signature { v: 0x25, r: U256::from_big_endian(&[0x11; 32]), s: U256::from_big_endian(&[0x22; 32]) });
    rpc.assert_request("eth_sendRawTransaction", [expected_raw]).unwrap();
}

#[tokio::test]
async fn send_transaction_fills_missing_fields_from_the_node() {
    let (device, rpc) = (MockDevice::new(), MockRpc::new());
    script_address_query(&device);
    device.push_app_configuration(0x01, (1, 10, 1));
    device.push_signature(0x25, [0x11; 32], [0x22; 32]);

    // responses are consumed newest-first: push in reverse call order
    rpc.push(tx_hash()).unwrap();
    rpc.push(U256::from(1_000_000_000u64)).unwrap(); // eth_gasPrice
    rpc.push(U256::from(21000u64)).unwrap(); // eth_estimateGas
    rpc.push(U256::from(5u64)).unwrap(); // eth_getTransactionCount
    rpc.push(U64::from(1u64)).unwrap(); // eth_chainId

    let sparse = TransactionParams {
        to: Some("abcabcabcabcabcabcabcabcabcabcabcabcabca".parse().unwrap()),
        value: Some(U256::zero()),
        ..Default::default()
    };

    let provider = provider(&device, &rpc);
    let hash = provider.send_transaction(sparse.clone()).await.unwrap();
    assert_eq!(hash, tx_hash());

    rpc.assert_request("eth_chainId", ()).unwrap();
    rpc.assert_request("eth_getTransactionCount", (device_address(), "pending")).unwrap();

    let mut at_estimate_time = sparse.clone();
    at_estimate_time.chain_id = Some(1.into());
    at_estimate_time.from = Some(device_address());
    at_estimate_time.nonce = Some(5.into());
    rpc.assert_request("eth_estimateGas", [at_estimate_time]).unwrap();

    rpc.assert_request("eth_gasPrice", ()).unwrap();

    let mut filled = sparse;
    filled.chain_id = Some(1.into());
    filled.from = Some(device_address());
    filled.nonce = Some(5.into());
    filled.gas_limit = Some(21000.into());
    filled.gas_price = Some(1_000_000_000u64.into());
    let expected_raw = TypedTransaction::try_from(filled).unwrap().rlp_signed(&Signature {
        v: 0x25,
        r: U256::from_big_endian(&[0x11; 32]),
        s: U256::from_big_endian(&[0x22; 32]),
    });
    rpc.assert_request("eth_sendRawTransaction", [expected_raw]).unwrap();
}

#[tokio::test]
async fn fee_market_requests_fill_fee_market_fields() {
    let (device, rpc) = (MockDevice::new(), MockRpc::new());

    rpc.push(U256::from(1_500_000_000u64)).unwrap(); // eth_maxPriorityFeePerGas
    rpc.push(U256::from(30_000_000_000u64)).unwrap(); // eth_gasPrice for maxFeePerGas

    let mut params = full_params();
    params.gas_price = None;
    params.transaction_type = Some(2.into());

    let provider = provider(&device, &rpc);
    provider.fill_transaction(&mut params).await.unwrap();

    assert_eq!(params.max_fee_per_gas, Some(U256::from(30_000_000_000u64)));
    assert_eq!(params.max_priority_fee_per_gas, Some(U256::from(1_500_000_000u64)));
    assert_eq!(params.gas_price, None);
    // chain id, nonce and gas were already present: no extra node calls
    rpc.assert_request("eth_gasPrice", ()).unwrap();
    rpc.assert_request("eth_maxPriorityFeePerGas", ()).unwrap();
    assert!(rpc.assert_request("eth_chainId", ()).is_err());
}

#[tokio::test]
async fn personal_sign_signs_hex_payloads_on_the_device() {
    let (device, rpc) = (MockDevice::new(), MockRpc::new());
    device.push_app_configuration(0x01, (1, 10, 1));
    device.push_signature(28, [0x11; 32], [0x22; 32]);

    let provider = provider(&device, &rpc);
    let signature: String = provider
        .request("personal_sign", ("0xdeadbeef", format!("0x{DEVICE_ADDRESS}")))
        .await
        .unwrap();

    let expected = format!("0x{}{}1c", "11".repeat(32), "22".repeat(32));
    assert_eq!(signature, expected);

    let exchanges = device.exchanges();
    assert_eq!(exchanges[1].ins, INS::SIGN_PERSONAL_MESSAGE as u8);
    // message bytes are the decoded hex payload
    assert!(exchanges[1].data.ends_with(&[0xde, 0xad, 0xbe, 0xef]));
}

#[tokio::test]
async fn personal_sign_coerces_plain_text_to_utf8_bytes() {
    let (device, rpc) = (MockDevice::new(), MockRpc::new());
    device.push_app_configuration(0x01, (1, 10, 1));
    device.push_signature(27, [0x11; 32], [0x22; 32]);

    let provider = provider(&device, &rpc);
    let _: String = provider
        .request("personal_sign", ("hello world", format!("0x{DEVICE_ADDRESS}")))
        .await
        .unwrap();

    assert!(device.exchanges()[1].data.ends_with(b"hello world"));
}

#[tokio::test]
async fn typed_data_methods_are_rejected() {
    let (device, rpc) = (MockDevice::new(), MockRpc::new());
    let provider = provider(&device, &rpc);

    let err = provider
        .request::<_, String>("eth_signTypedData_v4", ("0xabc", "{}"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ProviderError::Signer(LedgerError::UnsupportedOperation { .. })
    ));
    assert_eq!(device.acquires(), 0);
}

#[tokio::test]
async fn other_methods_pass_through_to_the_node() {
    let (device, rpc) = (MockDevice::new(), MockRpc::new());
    rpc.push(U64::from(12)).unwrap();

    let provider = provider(&device, &rpc);
    let block: U64 = provider.request("eth_blockNumber", ()).await.unwrap();

    assert_eq!(block.as_u64(), 12);
    rpc.assert_request("eth_blockNumber", ()).unwrap();
    assert_eq!(device.acquires(), 0);
}

#[tokio::test]
async fn enable_resolves_the_device_address() {
    let (device, rpc) = (MockDevice::new(), MockRpc::new());
    script_address_query(&device);

    let provider = provider(&device, &rpc);
    assert_eq!(provider.enable().await.unwrap(), device_address());
    // address is memoized for the provider surface as well
    assert_eq!(provider.enable().await.unwrap(), device_address());
    assert_eq!(device.acquires(), 1);
}

#[tokio::test]
async fn disconnects_surface_through_the_provider_subscription() {
    let (device, rpc) = (MockDevice::new(), MockRpc::new());
    device.push_app_configuration(0x01, (1, 10, 1));
    device.push_transport_closed("device unplugged");

    let provider = provider(&device, &rpc);
    let fired = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let observed = std::sync::Arc::clone(&fired);
    let _sub = provider.on_disconnect(move |_| {
        observed.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
    });

    let err = provider.send_transaction(full_params()).await.unwrap_err();
    assert!(matches!(err, ProviderError::Signer(LedgerError::TransportClosed(_))));
    assert_eq!(fired.load(std::sync::atomic::Ordering::SeqCst), 1);
}

#[tokio::test]
async fn malformed_send_transaction_params_are_rejected() {
    let (device, rpc) = (MockDevice::new(), MockRpc::new());
    let provider = provider(&device, &rpc);

    let err = provider.request::<_, TxHash>("eth_sendTransaction", 7u64).await.unwrap_err();
    assert!(matches!(err, ProviderError::InvalidParams { .. }));
    assert_eq!(device.acquires(), 0);
}
