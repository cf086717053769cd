// RasterGL
// copyright zipxing@hotmail.com 2022~2025

fn main() {
    use cfg_aliases::cfg_aliases;

    cfg_aliases! {
        // 平台别名
        wasm: { target_arch = "wasm32" },
        native: { not(wasm) },

        // http image fetcher only on native
        http_fetch: { all(native, feature = "http") },
        file_log: { all(native, feature = "log4rs") },
    }
}
