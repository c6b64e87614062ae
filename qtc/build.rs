fn main() {
    // Embedded in the second header line of every container we write
    let date = time::OffsetDateTime::now_utc().date();
    println!("cargo:rustc-env=QTC_BUILD_DATE={date}");
    println!("cargo:rerun-if-changed=build.rs");
}
