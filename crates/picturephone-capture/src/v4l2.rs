//! Minimal Video4Linux2 backend: single-plane MMAP capture of a YUYV
//! stream, converted to BGRA.
//!
//! This is the "opaque OS-specific capture session" of the data model;
//! nothing outside this module needs to know the device is V4L2.

use std::ffi::CString;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::frame::Frame;
use crate::CaptureError;

const VIDIOC_QUERYCAP: libc::c_ulong = 0x8068_5600;
const VIDIOC_S_FMT: libc::c_ulong = 0xc0d0_5605;
const VIDIOC_REQBUFS: libc::c_ulong = 0xc014_2408;
const VIDIOC_QUERYBUF: libc::c_ulong = 0xc058_4409;
const VIDIOC_QBUF: libc::c_ulong = 0xc058_440f;
const VIDIOC_DQBUF: libc::c_ulong = 0xc058_4411;
const VIDIOC_STREAMON: libc::c_ulong = 0x4004_5612;
const VIDIOC_STREAMOFF: libc::c_ulong = 0x4004_5613;

const V4L2_BUF_TYPE_VIDEO_CAPTURE: u32 = 1;
const V4L2_MEMORY_MMAP: u32 = 1;
const V4L2_PIX_FMT_YUYV: u32 = fourcc(b'Y', b'U', b'Y', b'V');
const NUM_BUFFERS: u32 = 4;

const fn fourcc(a: u8, b: u8, c: u8, d: u8) -> u32 {
    (a as u32) | ((b as u32) << 8) | ((c as u32) << 16) | ((d as u32) << 24)
}

#[repr(C)]
#[derive(Clone, Copy)]
struct V4l2Capability {
    driver: [u8; 16],
    card: [u8; 32],
    bus_info: [u8; 32],
    version: u32,
    capabilities: u32,
    device_caps: u32,
    reserved: [u32; 3],
}

#[repr(C)]
#[derive(Clone, Copy)]
struct V4l2PixFormat {
    width: u32,
    height: u32,
    pixelformat: u32,
    field: u32,
    bytesperline: u32,
    sizeimage: u32,
    colorspace: u32,
    priv_: u32,
    flags: u32,
    ycbcr_enc: u32,
    quantization: u32,
    xfer_func: u32,
}

#[repr(C)]
#[derive(Clone, Copy)]
struct V4l2Format {
    type_: u32,
    fmt: V4l2PixFormatUnion,
}

#[repr(C)]
#[derive(Clone, Copy)]
union V4l2PixFormatUnion {
    pix: V4l2PixFormat,
    raw_data: [u8; 200],
}

#[repr(C)]
#[derive(Clone, Copy)]
struct V4l2RequestBuffers {
    count: u32,
    type_: u32,
    memory: u32,
    capabilities: u32,
    reserved: [u32; 1],
}

#[repr(C)]
#[derive(Clone, Copy)]
struct V4l2Timecode {
    type_: u32,
    flags: u32,
    frames: u8,
    seconds: u8,
    minutes: u8,
    hours: u8,
    userbits: [u8; 4],
}

#[repr(C)]
#[derive(Clone, Copy)]
union V4l2BufferUnion {
    offset: u32,
    userptr: libc::c_ulong,
}

#[repr(C)]
#[derive(Clone, Copy)]
struct V4l2Buffer {
    index: u32,
    type_: u32,
    bytesused: u32,
    flags: u32,
    field: u32,
    timestamp: libc::timeval,
    timecode: V4l2Timecode,
    sequence: u32,
    memory: u32,
    m: V4l2BufferUnion,
    length: u32,
    reserved2: u32,
    request_fd: i32,
}

unsafe fn ioctl(fd: i32, request: libc::c_ulong, arg: *mut libc::c_void) -> std::io::Result<i32> {
    let ret = libc::ioctl(fd, request as _, arg);
    if ret < 0 {
        Err(std::io::Error::last_os_error())
    } else {
        Ok(ret)
    }
}

struct MappedBuffer {
    ptr: *mut libc::c_void,
    len: usize,
}

/// # Safety
/// The pointer is an mmap'd region owned exclusively by this struct.
unsafe impl Send for MappedBuffer {}

impl Drop for MappedBuffer {
    fn drop(&mut self) {
        // SAFETY: `ptr`/`len` came from a successful `mmap` of this length.
        unsafe {
            libc::munmap(self.ptr, self.len);
        }
    }
}

/// Open a V4L2 device node, negotiate YUYV capture at `width`x`height`,
/// and run a blocking capture loop on the current thread, writing each
/// converted BGRA frame into `slot` until `running` is cleared.
pub fn run_capture_loop(
    device_path: &str,
    width: u32,
    height: u32,
    slot: &Mutex<Option<Frame>>,
    running: &AtomicBool,
) -> Result<(), CaptureError> {
    let path = CString::new(device_path).map_err(|_| CaptureError::InvalidDevicePath)?;

    // SAFETY: `path` is a valid NUL-terminated C string.
    let raw_fd = unsafe { libc::open(path.as_ptr(), libc::O_RDWR | libc::O_NONBLOCK) };
    if raw_fd < 0 {
        return Err(CaptureError::OpenDevice(std::io::Error::last_os_error()));
    }
    // SAFETY: `raw_fd` is a just-opened, valid, owned file descriptor.
    let fd = unsafe { OwnedFd::from_raw_fd(raw_fd) };

    let mut cap = V4l2Capability {
        driver: [0; 16],
        card: [0; 32],
        bus_info: [0; 32],
        version: 0,
        capabilities: 0,
        device_caps: 0,
        reserved: [0; 3],
    };
    // SAFETY: `cap` is a valid, correctly sized out-parameter for VIDIOC_QUERYCAP.
    unsafe { ioctl(fd.as_raw_fd(), VIDIOC_QUERYCAP, std::ptr::addr_of_mut!(cap).cast()) }
        .map_err(CaptureError::QueryCap)?;

    let mut fmt = V4l2Format {
        type_: V4L2_BUF_TYPE_VIDEO_CAPTURE,
        fmt: V4l2PixFormatUnion {
            pix: V4l2PixFormat {
                width,
                height,
                pixelformat: V4L2_PIX_FMT_YUYV,
                field: 0,
                bytesperline: 0,
                sizeimage: 0,
                colorspace: 0,
                priv_: 0,
                flags: 0,
                ycbcr_enc: 0,
                quantization: 0,
                xfer_func: 0,
            },
        },
    };
    // SAFETY: `fmt` is a valid, correctly sized in/out-parameter for VIDIOC_S_FMT.
    unsafe { ioctl(fd.as_raw_fd(), VIDIOC_S_FMT, std::ptr::addr_of_mut!(fmt).cast()) }
        .map_err(CaptureError::SetFormat)?;
    // SAFETY: the union was just initialized as `pix` above.
    let negotiated = unsafe { fmt.fmt.pix };

    let mut req = V4l2RequestBuffers {
        count: NUM_BUFFERS,
        type_: V4L2_BUF_TYPE_VIDEO_CAPTURE,
        memory: V4L2_MEMORY_MMAP,
        capabilities: 0,
        reserved: [0],
    };
    // SAFETY: `req` is a valid, correctly sized in/out-parameter for VIDIOC_REQBUFS.
    unsafe { ioctl(fd.as_raw_fd(), VIDIOC_REQBUFS, std::ptr::addr_of_mut!(req).cast()) }
        .map_err(CaptureError::RequestBuffers)?;

    let mut buffers = Vec::with_capacity(req.count as usize);
    for index in 0..req.count {
        let mut buf = zeroed_buffer(index);
        // SAFETY: `buf` is a valid, correctly sized out-parameter for VIDIOC_QUERYBUF.
        unsafe { ioctl(fd.as_raw_fd(), VIDIOC_QUERYBUF, std::ptr::addr_of_mut!(buf).cast()) }
            .map_err(CaptureError::QueryBuffer)?;

        // SAFETY: `offset` was filled in by a successful VIDIOC_QUERYBUF for
        // this fd, so it is a valid mmap offset into the device's buffer.
        let ptr = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                buf.length as usize,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                fd.as_raw_fd(),
                libc::off_t::from(buf.m.offset),
            )
        };
        if ptr == libc::MAP_FAILED {
            return Err(CaptureError::Mmap(std::io::Error::last_os_error()));
        }
        buffers.push(MappedBuffer {
            ptr,
            len: buf.length as usize,
        });

        // SAFETY: `buf` is a valid in-parameter for VIDIOC_QBUF.
        unsafe { ioctl(fd.as_raw_fd(), VIDIOC_QBUF, std::ptr::addr_of_mut!(buf).cast()) }
            .map_err(CaptureError::QueueBuffer)?;
    }

    let mut stream_type = V4L2_BUF_TYPE_VIDEO_CAPTURE;
    // SAFETY: `stream_type` is a valid in-parameter for VIDIOC_STREAMON.
    unsafe {
        ioctl(
            fd.as_raw_fd(),
            VIDIOC_STREAMON,
            std::ptr::addr_of_mut!(stream_type).cast(),
        )
    }
    .map_err(CaptureError::StreamOn)?;

    tracing::info!(device = device_path, width = negotiated.width, height = negotiated.height, "V4L2 capture started");

    while running.load(Ordering::SeqCst) {
        let mut buf = zeroed_buffer(0);
        // SAFETY: `buf` is a valid out-parameter for VIDIOC_DQBUF.
        let dequeued = unsafe { ioctl(fd.as_raw_fd(), VIDIOC_DQBUF, std::ptr::addr_of_mut!(buf).cast()) };
        match dequeued {
            Ok(_) => {
                let index = buf.index as usize;
                let mapped = &buffers[index];
                // SAFETY: `mapped.ptr`/`bytesused` describe the just-filled
                // mmap region for this dequeued buffer.
                let yuyv = unsafe {
                    std::slice::from_raw_parts(mapped.ptr.cast::<u8>(), buf.bytesused as usize)
                };

                let mut frame = Frame::blank(negotiated.width, negotiated.height);
                yuyv_to_bgra(yuyv, negotiated.width, negotiated.height, &mut frame.pixels);

                if let Ok(mut guard) = slot.lock() {
                    *guard = Some(frame);
                }

                // SAFETY: `buf` still describes this buffer; requeue it.
                unsafe { ioctl(fd.as_raw_fd(), VIDIOC_QBUF, std::ptr::addr_of_mut!(buf).cast()) }
                    .map_err(CaptureError::QueueBuffer)?;
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                std::thread::sleep(std::time::Duration::from_millis(5));
            }
            Err(e) => return Err(CaptureError::DequeueBuffer(e)),
        }
    }

    // SAFETY: `stream_type` is a valid in-parameter for VIDIOC_STREAMOFF.
    unsafe {
        ioctl(
            fd.as_raw_fd(),
            VIDIOC_STREAMOFF,
            std::ptr::addr_of_mut!(stream_type).cast(),
        )
    }
    .ok();

    Ok(())
}

fn zeroed_buffer(index: u32) -> V4l2Buffer {
    V4l2Buffer {
        index,
        type_: V4L2_BUF_TYPE_VIDEO_CAPTURE,
        bytesused: 0,
        flags: 0,
        field: 0,
        timestamp: libc::timeval {
            tv_sec: 0,
            tv_usec: 0,
        },
        timecode: V4l2Timecode {
            type_: 0,
            flags: 0,
            frames: 0,
            seconds: 0,
            minutes: 0,
            hours: 0,
            userbits: [0; 4],
        },
        sequence: 0,
        memory: V4L2_MEMORY_MMAP,
        m: V4l2BufferUnion { offset: 0 },
        length: 0,
        reserved2: 0,
        request_fd: 0,
    }
}

/// Convert a packed YUYV (YUY2) buffer to BGRA using the standard
/// BT.601 integer approximation, alpha forced to opaque.
fn yuyv_to_bgra(yuyv: &[u8], width: u32, height: u32, out: &mut [u8]) {
    let w = width as usize;
    let h = height as usize;
    for row in 0..h {
        let row_in = row * w * 2;
        let row_out = row * w * 4;
        let mut x = 0;
        while x + 1 < w {
            let i = row_in + x * 2;
            if i + 3 >= yuyv.len() {
                break;
            }
            let y0 = i32::from(yuyv[i]);
            let u = i32::from(yuyv[i + 1]) - 128;
            let y1 = i32::from(yuyv[i + 2]);
            let v = i32::from(yuyv[i + 3]) - 128;

            let (b0, g0, r0) = yuv_to_bgr(y0, u, v);
            let (b1, g1, r1) = yuv_to_bgr(y1, u, v);

            let o = row_out + x * 4;
            out[o] = b0;
            out[o + 1] = g0;
            out[o + 2] = r0;
            out[o + 3] = 255;
            out[o + 4] = b1;
            out[o + 5] = g1;
            out[o + 6] = r1;
            out[o + 7] = 255;

            x += 2;
        }
    }
}

fn yuv_to_bgr(y: i32, u: i32, v: i32) -> (u8, u8, u8) {
    let c = y;
    let r = c + ((91_881 * v) >> 16);
    let g = c - ((22_554 * u) >> 16) - ((46_802 * v) >> 16);
    let b = c + ((116_130 * u) >> 16);
    (clamp_u8(b), clamp_u8(g), clamp_u8(r))
}

fn clamp_u8(v: i32) -> u8 {
    v.clamp(0, 255) as u8
}

/// Spawn the V4L2 capture loop on a dedicated thread, matching the
/// producer-thread shape of the rest of the capture crate.
pub fn spawn(
    device_path: String,
    width: u32,
    height: u32,
    slot: Arc<Mutex<Option<Frame>>>,
    running: Arc<AtomicBool>,
) -> std::thread::JoinHandle<()> {
    std::thread::Builder::new()
        .name("v4l2-capture".into())
        .spawn(move || {
            if let Err(e) = run_capture_loop(&device_path, width, height, &slot, &running) {
                tracing::error!("V4L2 capture thread exited with error: {e}");
            }
        })
        .expect("failed to spawn V4L2 capture thread")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gray_yuyv_produces_gray_bgra() {
        // Y=128, U=128, V=128 for two pixels -> neutral gray, alpha opaque.
        let yuyv = [128u8, 128, 128, 128];
        let mut out = vec![0u8; 2 * 4];
        yuyv_to_bgra(&yuyv, 2, 1, &mut out);
        assert_eq!(out[3], 255);
        assert_eq!(out[7], 255);
        // B, G, R should all be close to 128 for a neutral sample.
        for &c in &[out[0], out[1], out[2]] {
            assert!((120..=136).contains(&c));
        }
    }

    #[test]
    fn fourcc_matches_yuyv() {
        assert_eq!(V4L2_PIX_FMT_YUYV, u32::from_le_bytes(*b"YUYV"));
    }
}
