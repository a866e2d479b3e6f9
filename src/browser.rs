use anyhow::{anyhow, Result};
use futures::channel::oneshot::channel;
use serde::de::DeserializeOwned;
use std::future::Future;
use wasm_bindgen::closure::{Closure, WasmClosure};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;

#[rustfmt::skip]
use web_sys::{
    Document,
    Window,
    CanvasRenderingContext2d,
    HtmlCanvasElement,
    HtmlImageElement,
    Response,
};

// Constants related to HTML elements
mod html {
    pub const CANVAS_ID: &str = "canvas";
    pub const CANVAS_TAG: &str = "canvas";
    pub const CONTEXT_2D: &str = "2d";
}

// console on wasm32, stderr on host builds so unit tests can run natively
#[cfg(target_arch = "wasm32")]
macro_rules! log {
    ($($t:tt)*) => {
        web_sys::console::log_1(&format!($($t)*).into());
    };
}

#[cfg(not(target_arch = "wasm32"))]
macro_rules! log {
    ($($t:tt)*) => {
        eprintln!($($t)*);
    };
}

#[cfg(target_arch = "wasm32")]
macro_rules! error {
    ($($t:tt)*) => {
        web_sys::console::error_1(&format!($($t)*).into());
    };
}

#[cfg(not(target_arch = "wasm32"))]
macro_rules! error {
    ($($t:tt)*) => {
        eprintln!("error: {}", format!($($t)*));
    };
}

pub type FrameClosure = Closure<dyn FnMut(f64)>;

pub fn new_image() -> Result<HtmlImageElement> {
    HtmlImageElement::new().map_err(|err| anyhow!("Could not create image element : {:#?}", err))
}

pub fn context() -> Result<CanvasRenderingContext2d> {
    canvas()?
        .get_context(html::CONTEXT_2D)
        // Result<Option<Object>, JsValue>
        // - JsValue error mapped to anyhow
        // - None mapped to an error
        .map_err(|js_value| anyhow!("Error getting context : {:#?}", js_value))?
        .ok_or_else(|| anyhow!("No 2d context found"))?
        .dyn_into::<CanvasRenderingContext2d>()
        .map_err(|element| {
            anyhow!(
                "Error converting {:#?} to CanvasRenderingContext2d",
                element
            )
        })
}

/// Returns the page canvas, creating one sized to the window when the page
/// does not provide an element with id `canvas`
pub fn canvas() -> Result<HtmlCanvasElement> {
    match document()?.get_element_by_id(html::CANVAS_ID) {
        Some(element) => element
            .dyn_into::<HtmlCanvasElement>()
            .map_err(|element| anyhow!("Error converting {:#?} to HtmlCanvasElement", element)),
        None => create_canvas(),
    }
}

fn create_canvas() -> Result<HtmlCanvasElement> {
    let document = document()?;
    let canvas = document
        .create_element(html::CANVAS_TAG)
        .map_err(|err| anyhow!("Could not create canvas element : {:#?}", err))?
        .dyn_into::<HtmlCanvasElement>()
        .map_err(|element| anyhow!("Error converting {:#?} to HtmlCanvasElement", element))?;
    canvas.set_id(html::CANVAS_ID);

    let (width, height) = window_size()?;
    canvas.set_width(width);
    canvas.set_height(height);

    document
        .body()
        .ok_or_else(|| anyhow!("No body element found"))?
        .append_child(&canvas)
        .map_err(|err| anyhow!("Could not append canvas to body : {:#?}", err))?;
    Ok(canvas)
}

pub fn window() -> Result<Window> {
    web_sys::window().ok_or_else(|| anyhow!("Window not found"))
}

pub fn document() -> Result<Document> {
    window()?
        .document()
        .ok_or_else(|| anyhow!("No Document Found"))
}

fn window_size() -> Result<(u32, u32)> {
    let window = window()?;
    let dimension = |value: Result<JsValue, JsValue>, name: &str| -> Result<u32> {
        value
            .map_err(|err| anyhow!("Could not read window {} : {:#?}", name, err))?
            .as_f64()
            .map(|value| value as u32)
            .ok_or_else(|| anyhow!("Window {} is not a number", name))
    };
    Ok((
        dimension(window.inner_width(), "width")?,
        dimension(window.inner_height(), "height")?,
    ))
}

/// Milliseconds on the same clock as animation frame timestamps
pub fn now() -> Result<f64> {
    Ok(window()?
        .performance()
        .ok_or_else(|| anyhow!("Performance object not found"))?
        .now())
}

pub fn closure_wrap<T: WasmClosure + ?Sized>(data: Box<T>) -> Closure<T> {
    Closure::wrap(data)
}

pub fn request_animation_frame(callback: &FrameClosure) -> Result<i32> {
    window()?
        .request_animation_frame(callback.as_ref().unchecked_ref())
        .map_err(|err| anyhow!("Cannot request animation frame : {:#?}", err))
}

/// Resolves with the timestamp of the next display refresh
pub async fn next_animation_frame() -> Result<f64> {
    let (tx, rx) = channel::<f64>();
    let callback = FrameClosure::once(move |timestamp: f64| {
        let _ = tx.send(timestamp);
    });
    request_animation_frame(&callback)?;
    // callback must outlive the request, so it stays in scope until resolved
    let timestamp = rx.await?;
    drop(callback);
    Ok(timestamp)
}

pub fn spawn_local<F>(future: F)
where
    F: Future<Output = ()> + 'static,
{
    wasm_bindgen_futures::spawn_local(future);
}

pub async fn fetch_json<T>(json_path: &str) -> Result<T>
where
    T: DeserializeOwned,
{
    let resp_value = fetch_with_str(json_path).await?;
    let resp: Response = resp_value
        .dyn_into()
        .map_err(|element| anyhow!("error converting [{:#?}] to Response", element))?;
    if !resp.ok() {
        return Err(anyhow!(
            "fetching [{}] failed with status {}",
            json_path,
            resp.status()
        ));
    }
    let json = resp
        .json()
        .map_err(|err| anyhow!("Could not get JSON from response [{:#?}]", err))?;

    let json_value = JsFuture::from(json)
        .await
        .map_err(|err| anyhow!("error fetching [{:#?}]", err))?;

    serde_wasm_bindgen::from_value(json_value)
        .map_err(|err| anyhow!("error converting response : {:#?}", err))
}

async fn fetch_with_str(resource: &str) -> Result<JsValue> {
    let resp = window()?.fetch_with_str(resource);

    JsFuture::from(resp)
        .await
        .map_err(|err| anyhow!("error fetching : {:#?}", err))
}
