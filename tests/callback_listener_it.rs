mod common;

// std
use std::time::Duration;
// crates.io
use tokio::net::TcpStream;
// self
use common::*;
use fitbit_scraper::flows::{CallbackConfig, CallbackListener, InterruptFuture};

fn never() -> InterruptFuture {
	Box::pin(std::future::pending())
}

#[tokio::test]
async fn silent_connection_times_out_before_the_redirect_is_served() {
	let config = CallbackConfig::load(write_self_signed_pem(), 0)
		.expect("Generated PEM fixture should load.")
		.with_idle_timeout(Duration::from_millis(200));
	let listener = CallbackListener::bind(&config).await.expect("Binding should succeed.");
	let address = listener.local_addr().expect("Bound listener should report its address.");
	// Connected first and never sends a ClientHello.
	let _silent = TcpStream::connect(address).await.expect("Raw TCP connect should succeed.");
	let redirect = tokio::spawn(async move {
		insecure_reqwest_client()
			.get(format!("https://127.0.0.1:{}/?code=abc123", address.port()))
			.send()
			.await
	});
	let code = tokio::time::timeout(Duration::from_secs(10), listener.wait_for_code(never()))
		.await
		.expect("The silent connection should be dropped after the idle timeout.")
		.expect("The redirect should deliver the code.");

	assert_eq!(code, "abc123");

	let response = redirect
		.await
		.expect("Redirect task should not panic.")
		.expect("The redirect should receive the confirmation page.");

	assert!(response.status().is_success());
}

#[tokio::test]
async fn interrupt_ends_a_wait_stuck_on_a_silent_connection() {
	let config = CallbackConfig::load(write_self_signed_pem(), 0)
		.expect("Generated PEM fixture should load.");
	let listener = CallbackListener::bind(&config).await.expect("Binding should succeed.");
	let address = listener.local_addr().expect("Bound listener should report its address.");
	let _silent = TcpStream::connect(address).await.expect("Raw TCP connect should succeed.");
	let interrupt: InterruptFuture = Box::pin(tokio::time::sleep(Duration::from_millis(100)));
	let err = tokio::time::timeout(Duration::from_secs(10), listener.wait_for_code(interrupt))
		.await
		.expect("The interrupt should end the wait.")
		.expect_err("An interrupted wait should fail.");

	assert_eq!(err.to_string(), "Server interrupted.");
}
