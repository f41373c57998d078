/// JavaScript support code emitted at the top of every host program.
///
/// Vectors and matrices are `Float32Array`s in column-major order, the layout
/// `gl.uniformMatrix*fv` expects with `transpose = false`.
pub const RUNTIME: &str = r#"// Shader management.
function compile_glsl(gl, type, src) {
  var shader = gl.createShader(type);
  gl.shaderSource(shader, src);
  gl.compileShader(shader);
  if (!gl.getShaderParameter(shader, gl.COMPILE_STATUS)) {
    console.error("error: compiling shader:", gl.getShaderInfoLog(shader));
  }
  return shader;
}
function get_shader(gl, vertex_source, fragment_source) {
  var vert = compile_glsl(gl, gl.VERTEX_SHADER, vertex_source);
  var frag = compile_glsl(gl, gl.FRAGMENT_SHADER, fragment_source);
  var program = gl.createProgram();
  gl.attachShader(program, vert);
  gl.attachShader(program, frag);
  gl.linkProgram(program);
  if (!gl.getProgramParameter(program, gl.LINK_STATUS)) {
    console.error("error: linking program:", gl.getProgramInfoLog(program));
  }
  return program;
}
function bind_attribute(gl, location, buffer, size) {
  if (!buffer) {
    throw "no buffer";
  }
  gl.bindBuffer(gl.ARRAY_BUFFER, buffer);
  gl.vertexAttribPointer(location, size, gl.FLOAT, false, 0, 0);
  gl.enableVertexAttribArray(location);
}

// Host equivalents of shader builtins.
function vec3(x, y, z) {
  var out = new Float32Array(3);
  out[0] = x || 0.0;
  out[1] = y || 0.0;
  out[2] = z || 0.0;
  return out;
}
function vec4(x, y, z, w) {
  var out = new Float32Array(4);
  if (x instanceof Float32Array) {
    out.set(x);
    out[3] = y || 0.0;
    return out;
  }
  out[0] = x || 0.0;
  out[1] = y || 0.0;
  out[2] = z || 0.0;
  out[3] = w || 0.0;
  return out;
}
function dot(a, b) {
  var sum = 0.0;
  for (var i = 0; i < a.length; ++i) {
    sum += a[i] * b[i];
  }
  return sum;
}
function normalize(v) {
  var len = Math.sqrt(dot(v, v));
  var out = new Float32Array(v.length);
  for (var i = 0; i < v.length; ++i) {
    out[i] = len > 0.0 ? v[i] / len : 0.0;
  }
  return out;
}
function matmult(n, a, b) {
  var out = new Float32Array(n * n);
  for (var col = 0; col < n; ++col) {
    for (var row = 0; row < n; ++row) {
      var sum = 0.0;
      for (var k = 0; k < n; ++k) {
        sum += a[k * n + row] * b[col * n + k];
      }
      out[col * n + row] = sum;
    }
  }
  return out;
}
function mat3mult(a, b) {
  return matmult(3, a, b);
}
function mat4mult(a, b) {
  return matmult(4, a, b);
}

// Staged code values.
function code(prog, args) {
  return { prog: prog, args: args };
}
function run(c) {
  return c.prog.apply(null, c.args);
}"#;
