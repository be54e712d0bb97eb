fn main() {
    println!("cargo:rerun-if-env-changed=EPUCK2_CONFIG_JSON");
    println!("cargo:rerun-if-env-changed=EPUCK2_WIFI_SSID");
    println!("cargo:rerun-if-env-changed=EPUCK2_WIFI_PASSWORD");

    // Only the device build needs the ESP-IDF environment; host tests skip it.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
